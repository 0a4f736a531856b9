//! Command dispatch: bridges CLI args -> session operations -> output formatting.

pub mod clients;
pub mod config_cmd;
pub mod devices;
pub mod instcmd;
pub mod system;
pub mod variables;

use nutlink_core::Session;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub fn dispatch(cmd: Command, session: &mut Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Devices => devices::list(session, global),
        Command::Vars(args) => variables::list(session, &args.device, global),
        Command::Rw(args) => variables::list_rw(session, &args.device, global),
        Command::Get(args) => variables::get(session, &args, global),
        Command::Set(args) => variables::set(session, &args, global),
        Command::Enum(args) => variables::list_enum(session, &args, global),
        Command::Range(args) => variables::list_range(session, &args, global),
        Command::Cmds(args) => instcmd::list(session, &args, global),
        Command::Run(args) => instcmd::run(session, &args, global),
        Command::Clients(args) => clients::list(session, args.device.as_deref(), global),
        Command::Logins(args) => clients::logins(session, &args.device, global),
        Command::Version => system::version(session, global),
        // Config and Completions are handled before a session is opened
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
