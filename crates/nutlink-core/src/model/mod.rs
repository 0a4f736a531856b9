// ── Inventory model ──
//
// What a session knows about each device after building or refreshing
// its inventory.

pub mod device;

pub use device::{AccessMode, Device, Variable};
