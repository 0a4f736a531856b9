//! Server information handlers.

use serde::Serialize;

use nutlink_core::Session;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct VersionInfo {
    server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    protocol: Option<String>,
}

pub fn version(session: &mut Session, global: &GlobalOpts) -> Result<(), CliError> {
    let server = session.version()?;
    // Servers before NUT 2.6 answer PROTVER with ERR.
    let protocol = match session.protocol_version() {
        Ok(protocol) => Some(protocol),
        Err(e) if e.stage() == Some(nutlink_api::ErrorStage::Server) => {
            tracing::debug!(error = %e, "protocol version unavailable");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let info = VersionInfo { server, protocol };
    let out = output::render_single(
        &global.output,
        &info,
        |v| {
            let mut lines = vec![format!("Server:   {}", v.server)];
            if let Some(ref protocol) = v.protocol {
                lines.push(format!("Protocol: {protocol}"));
            }
            lines.join("\n")
        },
        |v| v.server.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
