//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use nutlink_config::ConfigError;
use nutlink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const PROTOCOL: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not talk to upsd at {endpoint}")]
    #[diagnostic(
        code(nutlink::connection_failed),
        help(
            "Check that upsd is running and listening on this address.\n\
             Endpoint: {endpoint}\n\
             Try: nutlink --host <host> --port <port> version"
        )
    )]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection to {endpoint} is closed")]
    #[diagnostic(code(nutlink::disconnected))]
    Disconnected { endpoint: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed at {step}: {reply}")]
    #[diagnostic(
        code(nutlink::auth_failed),
        help("Verify the username and password against upsd.users on the server.")
    )]
    AuthFailed { step: String, reply: String },

    #[error("Server refused the request: {code}")]
    #[diagnostic(
        code(nutlink::access_denied),
        help(
            "Writes and instant commands need a upsd user with the matching\n\
             actions or instcmds rights. Pass --username/--password or set them in a profile."
        )
    )]
    AccessDenied { code: String },

    #[error("No password available for profile '{profile}'")]
    #[diagnostic(
        code(nutlink::no_credentials),
        help(
            "Set password_env or password in the profile,\n\
             or set the NUTLINK_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(nutlink::not_found),
        help("Run: nutlink {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Protocol ─────────────────────────────────────────────────────
    #[error("Command {command} is not supported {by}")]
    #[diagnostic(code(nutlink::unsupported))]
    Unsupported { command: String, by: String },

    #[error("Invalid request: {reason}")]
    #[diagnostic(code(nutlink::invalid_request))]
    InvalidRequest { reason: String },

    #[error("Server error {code}")]
    #[diagnostic(code(nutlink::server_error), help("{hint}"))]
    Server { code: String, hint: String },

    #[error("Malformed reply from upsd: {message}")]
    #[diagnostic(
        code(nutlink::protocol),
        help("Increase --timeout if the server is slow; run with -vv to see the exchange.")
    )]
    Protocol { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nutlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(nutlink::profile_not_found),
        help("Available profiles: {available}\nConfig file: {path}")
    )]
    ProfileNotFound {
        name: String,
        available: String,
        path: String,
    },

    #[error(transparent)]
    #[diagnostic(code(nutlink::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(nutlink::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(nutlink::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to render TOML: {0}")]
    #[diagnostic(code(nutlink::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Disconnected { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::AccessDenied { .. } | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Unsupported { .. }
            | Self::InvalidRequest { .. }
            | Self::Validation { .. }
            | Self::ProfileNotFound { .. } => exit_code::USAGE,
            Self::Server { .. } | Self::Protocol { .. } => exit_code::PROTOCOL,
            Self::Config(_) | Self::Io(_) | Self::Json(_) | Self::Yaml(_) | Self::Toml(_) => {
                exit_code::GENERAL
            }
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeviceNotFound { name } => not_found("device", name, "devices"),
            CoreError::SessionClosed => Self::Disconnected {
                endpoint: "(session closed)".into(),
            },
            CoreError::Api(api) => api.into(),
        }
    }
}

impl From<nutlink_api::Error> for CliError {
    fn from(err: nutlink_api::Error) -> Self {
        use nutlink_api::Error;

        match err {
            Error::Transport { endpoint, source } => Self::ConnectionFailed { endpoint, source },
            Error::NotConnected { endpoint } => Self::Disconnected { endpoint },
            Error::AuthenticationFailed { step, reply } => Self::AuthFailed {
                step: step.into(),
                reply,
            },
            Error::UnsupportedByServer { command } => Self::Unsupported {
                command,
                by: "by the server".into(),
            },
            Error::UnsupportedByClient { command } => Self::Unsupported {
                command,
                by: "by nutlink".into(),
            },
            e @ (Error::UnsupportedSubcommand { .. }
            | Error::InvalidCommand { .. }
            | Error::InvalidArgument { .. }) => Self::InvalidRequest {
                reason: e.to_string(),
            },
            e @ (Error::UnexpectedResponse { .. }
            | Error::MalformedNumericField { .. }
            | Error::MissingQuotedValue { .. }) => Self::Protocol {
                message: e.to_string(),
            },
            Error::Server {
                code,
                detail,
                request,
            } => from_server(code, detail, &request),
        }
    }
}

fn from_server(code: String, detail: Option<String>, request: &str) -> CliError {
    let words: Vec<&str> = request.split_whitespace().collect();
    let word = |i: usize| words.get(i).copied().unwrap_or("?").to_owned();
    let instcmd = words.first() == Some(&"INSTCMD");
    let device = if instcmd { word(1) } else { word(2) };

    match code.as_str() {
        "UNKNOWN-UPS" => not_found("device", device, "devices"),
        "VAR-NOT-SUPPORTED" => not_found("variable", word(3), &format!("vars {device}")),
        "CMD-NOT-SUPPORTED" => {
            let command = if instcmd { word(2) } else { word(3) };
            not_found("command", command, &format!("cmds {device}"))
        }
        "ACCESS-DENIED" | "USERNAME-REQUIRED" | "PASSWORD-REQUIRED" => {
            CliError::AccessDenied { code }
        }
        _ => {
            let hint = match code.as_str() {
                "READONLY" => "The variable is not writable; see `nutlink rw <device>`.".to_owned(),
                "DRIVER-NOT-CONNECTED" | "DATA-STALE" => {
                    "The UPS driver is not delivering data; check the driver on the server."
                        .to_owned()
                }
                _ => detail.unwrap_or_else(|| format!("upsd rejected: {request}")),
            };
            CliError::Server { code, hint }
        }
    }
}

fn not_found(resource_type: &str, identifier: String, list_command: &str) -> CliError {
    CliError::NotFound {
        resource_type: resource_type.into(),
        identifier,
        list_command: list_command.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn server(code: &str, request: &str) -> CliError {
        nutlink_api::Error::Server {
            code: code.into(),
            detail: None,
            request: request.into(),
        }
        .into()
    }

    #[test]
    fn unknown_ups_names_the_device() {
        let err = server("UNKNOWN-UPS", "GET VAR badups battery.charge");
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert!(matches!(
            err,
            CliError::NotFound { identifier, .. } if identifier == "badups"
        ));
    }

    #[test]
    fn missing_command_points_at_cmds() {
        let err = server("CMD-NOT-SUPPORTED", "INSTCMD ups1 beeper.on");
        assert!(matches!(
            err,
            CliError::NotFound { identifier, list_command, .. }
                if identifier == "beeper.on" && list_command == "cmds ups1"
        ));
    }

    #[test]
    fn exit_codes_by_stage() {
        assert_eq!(server("READONLY", "SET VAR ups1 x 1").exit_code(), exit_code::PROTOCOL);
        assert_eq!(server("ACCESS-DENIED", "SET VAR ups1 x 1").exit_code(), exit_code::AUTH);

        let auth: CliError = nutlink_api::Error::AuthenticationFailed {
            step: "PASSWORD",
            reply: "ERR ACCESS-DENIED".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let refused: CliError = nutlink_api::Error::Transport {
            endpoint: "127.0.0.1:1".into(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        }
        .into();
        assert_eq!(refused.exit_code(), exit_code::CONNECTION);

        let local: CliError = nutlink_api::Error::UnsupportedByClient {
            command: "STARTTLS".into(),
        }
        .into();
        assert_eq!(local.exit_code(), exit_code::USAGE);

        let garbled: CliError = nutlink_api::Error::UnexpectedResponse {
            request: "LIST UPS".into(),
            raw: String::new(),
        }
        .into();
        assert_eq!(garbled.exit_code(), exit_code::PROTOCOL);
    }
}
