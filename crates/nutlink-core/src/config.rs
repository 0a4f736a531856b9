// ── Runtime session configuration ──
//
// Describes *how* to talk to one upsd and how much inventory to build.
// Never touches disk; nutlink-config or the caller builds it.

use nutlink_api::Endpoint;

/// Configuration for one [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub endpoint: Endpoint,
    /// Fetch a description for every variable and instant command while
    /// building inventory. Costs one round trip per item.
    pub fetch_descriptions: bool,
    /// Build the full device inventory when the session opens. One-shot
    /// consumers turn this off and call the listing operations directly.
    pub build_inventory: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(Endpoint::default())
    }
}

impl SessionConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            fetch_descriptions: false,
            build_inventory: true,
        }
    }

    pub fn with_descriptions(mut self, fetch: bool) -> Self {
        self.fetch_descriptions = fetch;
        self
    }

    pub fn with_inventory(mut self, build: bool) -> Self {
        self.build_inventory = build;
        self
    }
}
