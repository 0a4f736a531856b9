//! CLI configuration: thin wrapper around `nutlink_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--host, --port, --username, ...).

use secrecy::SecretString;

use nutlink_core::SessionConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use nutlink_config::{Config, Profile, config_path, load_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the session config from the config file, the active profile and
/// flag overrides. Flags win over the profile; the profile wins over
/// built-in defaults.
///
/// Without a matching profile the built-in defaults are used, unless a
/// profile was asked for by name.
pub fn build_session_config(global: &GlobalOpts) -> Result<SessionConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
                path: config_path().display().to_string(),
            });
        }
        None => Profile::default(),
    };

    let profile = apply_overrides(profile, global);
    let password = global
        .password
        .clone()
        .map(SecretString::from)
        .or_else(|| nutlink_config::resolve_password(&profile));

    let session = nutlink_config::profile_to_session_config_with(
        &profile,
        &profile_name,
        &cfg.defaults,
        password,
    )?;

    // One-shot commands never need the full inventory.
    Ok(session.with_inventory(false))
}

fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(port) = global.port {
        profile.port = port;
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    profile
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
