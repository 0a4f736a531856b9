// ── Device domain types ──
//
// One `Device` per name in `LIST UPS`. Variables merge `LIST VAR` and
// `LIST RW`, tagged with their access mode.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use nutlink_api::Listing;
use serde::{Deserialize, Serialize};

/// Whether a variable can be written with `SET VAR`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AccessMode {
    #[default]
    ReadOnly,
    ReadWrite,
}

/// A variable's last known value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub value: String,
    pub access: AccessMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Variable {
    pub fn new(value: impl Into<String>, access: AccessMode) -> Self {
        Self {
            value: value.into(),
            access,
            description: None,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.access == AccessMode::ReadWrite
    }
}

/// A power device known to the server.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub name: String,
    pub description: String,
    /// Instant command name to description. Without description fetching
    /// the description is the command name itself.
    pub commands: IndexMap<String, String>,
    pub variables: IndexMap<String, Variable>,
    /// Wall-clock time of the last refresh.
    pub refreshed_at: DateTime<Utc>,
    #[serde(skip)]
    refreshed: Instant,
}

impl Device {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            commands: IndexMap::new(),
            variables: IndexMap::new(),
            refreshed_at: Utc::now(),
            refreshed: Instant::now(),
        }
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Current value of a variable, if the device has it.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(|v| v.value.as_str())
    }

    /// Variables writable with `SET VAR`, in server order.
    pub fn rw_variables(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables
            .iter()
            .filter(|(_, v)| v.is_writable())
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Monotonic time since the last refresh.
    pub fn age(&self) -> Duration {
        self.refreshed.elapsed()
    }

    pub(crate) fn stamp(&mut self) {
        self.refreshed_at = Utc::now();
        self.refreshed = Instant::now();
    }
}

/// Merge `LIST VAR` and `LIST RW` into one map.
///
/// Keys in both are read-write with the `LIST RW` value; keys only in
/// `LIST RW` are appended after the `LIST VAR` keys.
pub(crate) fn merge_variables(vars: Listing, rw: Listing) -> IndexMap<String, Variable> {
    let mut merged: IndexMap<String, Variable> = vars
        .into_iter()
        .map(|(name, value)| (name, Variable::new(value, AccessMode::ReadOnly)))
        .collect();

    for (name, value) in rw {
        merged.insert(name, Variable::new(value, AccessMode::ReadWrite));
    }
    merged
}

/// Apply fresh `LIST VAR` values, keeping access mode and description for
/// variables that still exist. Variables the server no longer lists are
/// dropped.
pub(crate) fn refresh_variables(
    previous: &IndexMap<String, Variable>,
    fresh: Listing,
) -> IndexMap<String, Variable> {
    fresh
        .into_iter()
        .map(|(name, value)| {
            let variable = match previous.get(&name) {
                Some(old) => Variable {
                    value,
                    access: old.access,
                    description: old.description.clone(),
                },
                None => Variable::new(value, AccessMode::ReadOnly),
            };
            (name, variable)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn listing(pairs: &[(&str, &str)]) -> Listing {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn merge_tags_access_mode() {
        let merged = merge_variables(
            listing(&[("battery.charge", "100"), ("ups.id", "a")]),
            listing(&[("ups.id", "a"), ("ups.delay.start", "30")]),
        );

        assert_eq!(merged["battery.charge"].access, AccessMode::ReadOnly);
        assert_eq!(merged["ups.id"].access, AccessMode::ReadWrite);
        assert_eq!(merged["ups.delay.start"].access, AccessMode::ReadWrite);
        assert_eq!(
            merged.keys().collect::<Vec<_>>(),
            vec!["battery.charge", "ups.id", "ups.delay.start"]
        );
    }

    #[test]
    fn refresh_keeps_metadata_and_drops_vanished() {
        let mut previous = merge_variables(
            listing(&[("battery.charge", "100"), ("ups.id", "a"), ("gone", "x")]),
            listing(&[("ups.id", "a")]),
        );
        previous["ups.id"].description = Some("UPS identifier".into());

        let fresh = refresh_variables(
            &previous,
            listing(&[("battery.charge", "97"), ("ups.id", "b"), ("new.var", "1")]),
        );

        assert_eq!(fresh["battery.charge"].value, "97");
        assert_eq!(fresh["ups.id"].access, AccessMode::ReadWrite);
        assert_eq!(fresh["ups.id"].description.as_deref(), Some("UPS identifier"));
        assert_eq!(fresh["new.var"].access, AccessMode::ReadOnly);
        assert!(!fresh.contains_key("gone"));
    }

    #[test]
    fn rw_variables_filters_writable() {
        let mut device = Device::new("ups1", "Test UPS");
        device.variables = merge_variables(
            listing(&[("battery.charge", "100"), ("ups.id", "a")]),
            listing(&[("ups.id", "a")]),
        );
        let rw: Vec<_> = device.rw_variables().map(|(k, _)| k).collect();
        assert_eq!(rw, vec!["ups.id"]);
        assert_eq!(device.value("battery.charge"), Some("100"));
    }

    #[test]
    fn stamp_resets_age() {
        let mut device = Device::new("ups1", "Test UPS");
        let before = device.refreshed_at;
        std::thread::sleep(Duration::from_millis(5));
        device.stamp();
        assert!(device.refreshed_at >= before);
        assert!(device.age() < Duration::from_secs(1));
    }

    #[test]
    fn access_mode_display() {
        assert_eq!(AccessMode::ReadWrite.to_string(), "read-write");
    }
}
