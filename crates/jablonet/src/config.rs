//! CLI configuration -- thin wrapper around `jablonet_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--username, --service-id, --base-url, --timeout, --retry-cooldown).

use secrecy::SecretString;

use jablonet_config::{Profile, SecretKind, resolve_secret};
use jablonet_core::ControllerConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use jablonet_config::{Config, config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// The active profile as stored, or an empty one when none matches.
pub fn active_profile(global: &GlobalOpts) -> Profile {
    let cfg = load_config_or_default();
    let name = active_profile_name(global, &cfg);
    cfg.profiles.get(&name).cloned().unwrap_or_default()
}

/// Build a `ControllerConfig` from the config file, profile, and flags.
///
/// Flags win over profile values. Without a matching profile the account
/// must come entirely from flags and `JABLONET_*` variables.
pub fn build_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let fallback = Profile::default();
    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile,
        None if global.profile.is_some() => {
            let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
            names.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        None => &fallback,
    };

    let merged = Profile {
        username: global.username.clone().or_else(|| profile.username.clone()),
        password: profile.password.clone(),
        service_id: global
            .service_id
            .clone()
            .or_else(|| profile.service_id.clone()),
        control_code: profile.control_code.clone(),
        base_url: global.base_url.clone().or_else(|| profile.base_url.clone()),
        timeout: global.timeout.or(profile.timeout),
        retry_cooldown: global.retry_cooldown.or(profile.retry_cooldown),
        names: profile.names.clone(),
    };

    let config =
        jablonet_config::profile_to_controller_config(&merged, &profile_name, &cfg.defaults)?;

    if config.retry_cooldown.is_zero() {
        tracing::warn!("retry cooldown is zero; failed re-logins will not back off");
    }
    Ok(config)
}

/// Resolve the PGM control code: flag → env/keyring/config → prompt.
pub fn resolve_control_code(
    global: &GlobalOpts,
    flag: Option<String>,
) -> Result<SecretString, CliError> {
    if let Some(code) = flag {
        return Ok(SecretString::from(code));
    }

    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);
    let fallback = Profile::default();
    let profile = cfg.profiles.get(&profile_name).unwrap_or(&fallback);

    if let Ok(code) = resolve_secret(SecretKind::ControlCode, profile, &profile_name) {
        return Ok(code);
    }

    let code = rpassword::prompt_password("Control code: ").map_err(|e| CliError::Validation {
        field: "control code".into(),
        reason: format!("prompt failed: {e}"),
    })?;
    if code.is_empty() {
        return Err(CliError::Validation {
            field: "control code".into(),
            reason: "control code cannot be empty".into(),
        });
    }
    Ok(SecretString::from(code))
}
