//! Client command handlers: clients, logins.

use serde::Serialize;
use tabled::Tabled;

use nutlink_core::Session;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize, Tabled)]
struct ClientEntry {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Client")]
    host: String,
}

#[derive(Serialize)]
struct Logins {
    device: String,
    logins: u64,
}

pub fn list(
    session: &mut Session,
    device: Option<&str>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let clients: Vec<ClientEntry> = session
        .list_clients(device)?
        .into_iter()
        .flat_map(|(device, hosts)| {
            hosts.into_iter().map(move |host| ClientEntry {
                device: device.clone(),
                host,
            })
        })
        .collect();

    let out = output::render_list(
        &global.output,
        &clients,
        |c| ClientEntry {
            device: c.device.clone(),
            host: c.host.clone(),
        },
        |c| format!("{} {}", c.device, c.host),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn logins(session: &mut Session, device: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let logins = Logins {
        device: device.to_owned(),
        logins: session.num_logins(device)?,
    };
    let out = output::render_single(
        &global.output,
        &logins,
        |l| format!("{}: {} logged in", l.device, l.logins),
        |l| l.logins.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
