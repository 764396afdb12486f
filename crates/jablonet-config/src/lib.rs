//! Configuration for the JabloNET tools.
//!
//! TOML profiles, secret resolution (env + keyring + plaintext), and
//! translation to `jablonet_core::ControllerConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use jablonet_core::{
    ControllerConfig, Credentials, DEFAULT_RETRY_COOLDOWN, DEFAULT_TIMEOUT,
};

/// Keyring service name for every stored secret.
pub const KEYRING_SERVICE: &str = "jablonet";

/// Environment prefix for config overrides and secrets.
pub const ENV_PREFIX: &str = "JABLONET_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {secret} configured for profile '{profile}'")]
    MissingSecret { secret: SecretKind, profile: String },

    #[error("no username configured for profile '{profile}'")]
    NoUsername { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// The named profile, or the default one when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-call timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Cooldown after a failed recovery login, seconds.
    #[serde(default = "default_retry_cooldown")]
    pub retry_cooldown: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            retry_cooldown: default_retry_cooldown(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
fn default_retry_cooldown() -> u64 {
    DEFAULT_RETRY_COOLDOWN.as_secs()
}

/// One JabloNET account.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Account login (usually an e-mail address).
    pub username: Option<String>,

    /// Password (plaintext; prefer keyring).
    pub password: Option<String>,

    /// Selects one panel when the account has several.
    pub service_id: Option<String>,

    /// Code for PGM control (plaintext; prefer keyring).
    pub control_code: Option<String>,

    /// Service root override, e.g. a regional mirror.
    pub base_url: Option<String>,

    pub timeout: Option<u64>,

    pub retry_cooldown: Option<u64>,

    /// Custom point labels. Keyed by point id, or by `category/id` when
    /// ids collide across categories (e.g. `thermometers/1`, `pgm/1`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub names: BTreeMap<String, String>,
}

impl Profile {
    /// Custom label for a point. A `category/id` key beats a bare id;
    /// the category may be given by label or wire key.
    pub fn point_name(&self, category_keys: &[&str], id: &str) -> Option<&str> {
        category_keys
            .iter()
            .find_map(|category| self.names.get(&format!("{category}/{id}")))
            .or_else(|| self.names.get(id))
            .map(String::as_str)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "jablonet", "jablonet").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("jablonet");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific file, layered over defaults and under
/// `JABLONET_*` environment overrides (`__` separates nested keys).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Secrets ─────────────────────────────────────────────────────────

/// The two secrets a profile needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Password,
    ControlCode,
}

impl SecretKind {
    fn env_var(self) -> String {
        match self {
            Self::Password => format!("{ENV_PREFIX}PASSWORD"),
            Self::ControlCode => format!("{ENV_PREFIX}CONTROL_CODE"),
        }
    }

    fn keyring_user(self, profile_name: &str) -> String {
        match self {
            Self::Password => format!("{profile_name}/password"),
            Self::ControlCode => format!("{profile_name}/control-code"),
        }
    }

    fn plaintext(self, profile: &Profile) -> Option<&str> {
        match self {
            Self::Password => profile.password.as_deref(),
            Self::ControlCode => profile.control_code.as_deref(),
        }
    }
}

impl std::fmt::Display for SecretKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password => f.write_str("password"),
            Self::ControlCode => f.write_str("control code"),
        }
    }
}

/// Resolve a secret: env var → keyring → plaintext in config.
pub fn resolve_secret(
    kind: SecretKind,
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    if let Ok(val) = std::env::var(kind.env_var()) {
        return Ok(SecretString::from(val));
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &kind.keyring_user(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    if let Some(value) = kind.plaintext(profile) {
        return Ok(SecretString::from(value.to_owned()));
    }

    Err(ConfigError::MissingSecret {
        secret: kind,
        profile: profile_name.into(),
    })
}

/// Store a secret in the system keyring.
pub fn store_secret(kind: SecretKind, profile_name: &str, value: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &kind.keyring_user(profile_name))?;
    entry.set_password(value)?;
    Ok(())
}

// ── Translation to core config ──────────────────────────────────────

/// Resolve the account credentials of a profile.
pub fn resolve_credentials(profile: &Profile, profile_name: &str) -> Result<Credentials, ConfigError> {
    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var(format!("{ENV_PREFIX}USERNAME")).ok())
        .ok_or_else(|| ConfigError::NoUsername {
            profile: profile_name.into(),
        })?;
    let password = resolve_secret(SecretKind::Password, profile, profile_name)?;

    let mut credentials = Credentials::new(username, password);
    if let Some(ref id) = profile.service_id {
        credentials = credentials.with_service_id(id.clone());
    }
    Ok(credentials)
}

/// Build a `ControllerConfig` from a profile, falling back to `defaults`.
pub fn profile_to_controller_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let credentials = resolve_credentials(profile, profile_name)?;
    let mut config = ControllerConfig::new(credentials)
        .with_timeout(Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)))
        .with_retry_cooldown(Duration::from_secs(
            profile.retry_cooldown.unwrap_or(defaults.retry_cooldown),
        ));

    if let Some(ref raw) = profile.base_url {
        let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
        config = config.with_base_url(url);
    }

    if config.timeout.is_zero() {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be greater than zero".into(),
        });
    }

    Ok(config)
}
