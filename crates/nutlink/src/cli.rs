//! Clap derive structures for the `nutlink` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nutlink -- query and control UPS devices through upsd
#[derive(Debug, Parser)]
#[command(
    name = "nutlink",
    version,
    about = "Query and control Network UPS Tools servers from the command line",
    long_about = "A client for the Network UPS Tools upsd line protocol (TCP port 3493).\n\n\
        Lists devices, variables and instant commands, reads and writes\n\
        variables, and runs instant commands on any NUT server.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "NUTLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// upsd host (overrides profile)
    #[arg(long, short = 'H', env = "NUTLINK_HOST", global = true)]
    pub host: Option<String>,

    /// upsd port (overrides profile)
    #[arg(long, short = 'P', env = "NUTLINK_PORT", global = true)]
    pub port: Option<u16>,

    /// Username sent with USERNAME
    #[arg(long, short = 'u', env = "NUTLINK_USERNAME", global = true)]
    pub username: Option<String>,

    /// Password sent with PASSWORD
    #[arg(long, env = "NUTLINK_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NUTLINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Response timeout in seconds (overrides profile)
    #[arg(long, short = 't', env = "NUTLINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List devices served by upsd
    #[command(alias = "ups", alias = "d")]
    Devices,

    /// List a device's variables and their values
    Vars(DeviceArgs),

    /// List a device's writable variables
    Rw(DeviceArgs),

    /// List a device's instant commands
    Cmds(CmdsArgs),

    /// Read one variable
    Get(GetArgs),

    /// Write one variable
    Set(SetArgs),

    /// Run an instant command
    Run(RunArgs),

    /// List the allowed values of an enumerated variable
    Enum(VarArgs),

    /// List the allowed ranges of a ranged variable
    Range(VarArgs),

    /// List clients logged in to a device (all devices if omitted)
    Clients(ClientsArgs),

    /// Show the number of clients logged in to a device
    Logins(DeviceArgs),

    /// Show server and protocol versions
    Version,

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DeviceArgs {
    /// Device name as listed by `nutlink devices`
    pub device: String,
}

#[derive(Debug, Args)]
pub struct VarArgs {
    /// Device name
    pub device: String,

    /// Variable name (e.g. input.transfer.low)
    pub var: String,
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CmdsArgs {
    /// Device name
    pub device: String,

    /// Fetch each command's description (one request per command)
    #[arg(long, short = 'd')]
    pub describe: bool,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Device name
    pub device: String,

    /// Variable name
    pub var: String,

    /// Also fetch the variable's description and type
    #[arg(long, short = 'l')]
    pub long: bool,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Device name
    pub device: String,

    /// Variable name
    pub var: String,

    /// New value (quoted on the wire as needed)
    pub value: String,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Device name
    pub device: String,

    /// Instant command (e.g. beeper.off)
    pub command: String,
}

#[derive(Debug, Args)]
pub struct ClientsArgs {
    /// Device name
    pub device: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display the loaded configuration with passwords masked
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
