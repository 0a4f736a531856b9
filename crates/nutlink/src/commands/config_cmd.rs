//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

const MASK: &str = "****";

/// Mask plaintext passwords so the config can be shown or pasted safely.
fn redact(mut cfg: Config) -> Config {
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(MASK.into());
        }
    }
    cfg
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redact(config::load_config()?);
            let profile = config::active_profile_name(global, &cfg);

            // Table and plain views show the file as TOML.
            let text = format!(
                "# active profile: {profile}\n{}",
                toml::to_string_pretty(&cfg)?
            );
            let out =
                output::render_single(&global.output, &cfg, |_| text.clone(), |_| text.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Profile;

    #[test]
    fn redact_masks_only_passwords() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "rack".into(),
            Profile {
                username: Some("monitor".into()),
                password: Some("hunter2".into()),
                ..Profile::default()
            },
        );
        cfg.profiles.insert("closet".into(), Profile::default());

        let cfg = redact(cfg);
        assert_eq!(cfg.profiles["rack"].password.as_deref(), Some(MASK));
        assert_eq!(cfg.profiles["rack"].username.as_deref(), Some("monitor"));
        assert_eq!(cfg.profiles["closet"].password, None);
    }
}
