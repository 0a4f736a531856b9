// nutlink-core: Session lifecycle and device inventory on top of nutlink-api.

pub mod config;
pub mod error;
pub mod model;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SessionConfig;
pub use error::CoreError;
pub use model::{AccessMode, Device, Variable};
pub use session::{Session, SessionState};

pub use nutlink_api::{ClientList, Endpoint, Listing, VarType};
