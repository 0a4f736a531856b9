// ── Core error types ──
//
// Protocol failures pass through untouched so callers can still ask which
// pipeline stage failed. Core adds only what the API layer cannot know:
// inventory lookups and session teardown.

use nutlink_api::ErrorStage;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Device not found: {name}")]
    DeviceNotFound { name: String },

    #[error("Session is closed")]
    SessionClosed,

    #[error(transparent)]
    Api(#[from] nutlink_api::Error),
}

impl CoreError {
    /// The protocol pipeline stage, for errors that came from the wire.
    pub fn stage(&self) -> Option<ErrorStage> {
        self.api().map(nutlink_api::Error::stage)
    }

    pub fn api(&self) -> Option<&nutlink_api::Error> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}
