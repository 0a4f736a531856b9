// nutlink-api: Blocking Rust client for the Network UPS Tools (upsd) line protocol

pub mod client;
pub mod error;
pub mod extract;
pub mod framer;
pub mod grammar;
pub mod models;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use client::{ClientState, NutClient};
pub use error::{Error, ErrorStage};
pub use grammar::{CommandLine, Grammar};
pub use models::{ClientList, Listing, VarType};
pub use transport::{DEFAULT_PORT, DEFAULT_TIMEOUT, Endpoint};
