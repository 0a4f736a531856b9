//! Device command handlers.

use serde::Serialize;
use tabled::Tabled;

use nutlink_core::Session;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct DeviceEntry {
    name: String,
    description: String,
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&DeviceEntry> for DeviceRow {
    fn from(d: &DeviceEntry) -> Self {
        Self {
            name: d.name.clone(),
            description: d.description.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn list(session: &mut Session, global: &GlobalOpts) -> Result<(), CliError> {
    let devices: Vec<DeviceEntry> = session
        .list_devices()?
        .into_iter()
        .map(|(name, description)| DeviceEntry { name, description })
        .collect();

    let out = output::render_list(
        &global.output,
        &devices,
        |d| DeviceRow::from(d),
        |d| d.name.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
