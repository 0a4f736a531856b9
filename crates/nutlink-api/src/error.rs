use std::io;

use thiserror::Error;

/// Which stage of the request pipeline produced an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorStage {
    /// Local grammar check, before any I/O.
    Validation,
    /// Socket connect, write or read.
    Transport,
    /// USERNAME / PASSWORD exchange.
    Authentication,
    /// BEGIN / END block framing.
    Framing,
    /// Quoted or numeric field extraction.
    Extraction,
    /// `ERR ...` reply from upsd.
    Server,
}

/// Top-level error type for the `nutlink-api` crate.
///
/// Covers every failure mode of one request: local validation, transport,
/// authentication, framing, extraction and server-reported errors.
/// `nutlink-core` wraps these without flattening them.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Socket could not be established, or died while writing/reading.
    #[error("transport error talking to {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// An operation needed a live connection but none is open.
    #[error("not connected to {endpoint}")]
    NotConnected { endpoint: String },

    // ── Authentication ──────────────────────────────────────────────
    /// `USERNAME` or `PASSWORD` did not get a bare `OK` back.
    #[error("authentication failed at {step}: {reply}")]
    AuthenticationFailed { step: &'static str, reply: String },

    // ── Validation ──────────────────────────────────────────────────
    /// The server's HELP listing does not contain this command.
    #[error("command {command} is not supported by the server")]
    UnsupportedByServer { command: String },

    /// The client grammar does not contain this command.
    #[error("command {command} is not supported by this client")]
    UnsupportedByClient { command: String },

    /// The command exists but the sub-command (or its parameter form) does not.
    #[error("sub-command {subcommand:?} is not valid for {command}")]
    UnsupportedSubcommand { command: String, subcommand: String },

    /// The request line itself is unusable (empty, embedded newline).
    #[error("invalid command line: {reason}")]
    InvalidCommand { reason: String },

    /// An argument cannot be placed on the wire safely.
    #[error("invalid {argument}: {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: String,
    },

    // ── Framing / extraction ────────────────────────────────────────
    /// Framing invariant violated (missing BEGIN/END, wrong echo, no reply).
    #[error("unexpected response to {request:?}: {raw:?}")]
    UnexpectedResponse { request: String, raw: String },

    /// A numeric field could not be parsed.
    #[error("malformed numeric field in {line:?}")]
    MalformedNumericField { line: String },

    /// A quoted value was expected but the line had none.
    #[error("missing quoted value in {line:?}")]
    MissingQuotedValue { line: String },

    // ── Server ──────────────────────────────────────────────────────
    /// upsd answered with `ERR <code> [detail]`.
    #[error("server error {code} in reply to {request:?}")]
    Server {
        code: String,
        detail: Option<String>,
        request: String,
    },
}

impl Error {
    /// The pipeline stage this error came from.
    pub fn stage(&self) -> ErrorStage {
        match self {
            Self::Transport { .. } | Self::NotConnected { .. } => ErrorStage::Transport,
            Self::AuthenticationFailed { .. } => ErrorStage::Authentication,
            Self::UnsupportedByServer { .. }
            | Self::UnsupportedByClient { .. }
            | Self::UnsupportedSubcommand { .. }
            | Self::InvalidCommand { .. }
            | Self::InvalidArgument { .. } => ErrorStage::Validation,
            Self::UnexpectedResponse { .. } => ErrorStage::Framing,
            Self::MalformedNumericField { .. } | Self::MissingQuotedValue { .. } => {
                ErrorStage::Extraction
            }
            Self::Server { .. } => ErrorStage::Server,
        }
    }

    /// Raw server text attached to the error, if any.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::AuthenticationFailed { reply, .. } => Some(reply),
            Self::UnexpectedResponse { raw, .. } => Some(raw),
            Self::MalformedNumericField { line } | Self::MissingQuotedValue { line } => Some(line),
            Self::Server { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Returns `true` if the request never reached the wire.
    pub fn is_local_rejection(&self) -> bool {
        self.stage() == ErrorStage::Validation
    }

    /// Returns `true` if the connection can no longer be trusted to pair
    /// the next reply with the next request.
    ///
    /// A reply that was not read in full (timeout, broken block) may still
    /// arrive later and would be taken as the answer to the following call.
    pub fn desynchronizes_stream(&self) -> bool {
        matches!(self.stage(), ErrorStage::Transport | ErrorStage::Framing)
    }

    /// The upsd error code (e.g. `UNKNOWN-UPS`), if this is a server error.
    pub fn server_code(&self) -> Option<&str> {
        match self {
            Self::Server { code, .. } => Some(code),
            _ => None,
        }
    }
}
