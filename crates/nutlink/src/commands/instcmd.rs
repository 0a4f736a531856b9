//! Instant command handlers: cmds, run.

use serde::Serialize;
use tabled::Tabled;

use nutlink_core::Session;

use crate::cli::{CmdsArgs, GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct CommandEntry {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Tabled)]
struct CommandRow {
    #[tabled(rename = "Command")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&CommandEntry> for CommandRow {
    fn from(c: &CommandEntry) -> Self {
        Self {
            name: c.name.clone(),
            description: c.description.clone().unwrap_or_default(),
        }
    }
}

pub fn list(session: &mut Session, args: &CmdsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let names = session.list_commands(&args.device)?;

    let mut commands = Vec::with_capacity(names.len());
    for name in names {
        let description = if args.describe {
            Some(session.client()?.command_description(&args.device, &name)?)
        } else {
            None
        };
        commands.push(CommandEntry { name, description });
    }

    let out = output::render_list(
        &global.output,
        &commands,
        |c| CommandRow::from(c),
        |c| c.name.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn run(session: &mut Session, args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    session.run_command(&args.device, &args.command)?;
    if !global.quiet {
        eprintln!("{} sent to {}", args.command, args.device);
    }
    Ok(())
}
