//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use jablonet_config::ConfigError;
use jablonet_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const AUTHORIZATION: i32 = 5;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const COOLING_DOWN: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("JabloNET is unreachable: {message}")]
    #[diagnostic(
        code(jablonet::connection_failed),
        help(
            "The request failed even after logging in again.\n\
             Check your network, or try again later with -v for details."
        )
    )]
    ConnectionFailed { message: String },

    #[error("Cooling down after a failed re-login, retry in {retry_after}")]
    #[diagnostic(
        code(jablonet::cooling_down),
        help(
            "JabloNET refused a recovery login. Requests are paused until {until}\n\
             to avoid hammering the service."
        )
    )]
    CoolingDown { retry_after: String, until: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(jablonet::auth_failed),
        help(
            "Verify your JabloNET username and password.\n\
             Run: jablonet config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(jablonet::no_credentials),
        help(
            "Configure credentials with: jablonet config init\n\
             Or set JABLONET_USERNAME and JABLONET_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Control ──────────────────────────────────────────────────────

    #[error("Control code rejected for output {point_id}")]
    #[diagnostic(
        code(jablonet::authorization_denied),
        help("Store the correct code with: jablonet config set-code")
    )]
    AuthorizationDenied { point_id: String },

    #[error("Panel rejected the command for output {point_id} (code {code})")]
    #[diagnostic(code(jablonet::command_rejected))]
    CommandRejected { point_id: String, code: i64 },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(jablonet::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(jablonet::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: jablonet config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(jablonet::config))]
    Config { message: String },

    #[error("Connection closed")]
    #[diagnostic(code(jablonet::closed))]
    Closed,

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::CoolingDown { .. } => exit_code::COOLING_DOWN,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::AuthorizationDenied { .. } => exit_code::AUTHORIZATION,
            Self::CommandRejected { .. } => exit_code::REJECTED,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport { message } => CliError::ConnectionFailed { message },
            CoreError::SessionExpired => CliError::ConnectionFailed {
                message: "session expired again right after logging in".into(),
            },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "default".into(),
                message,
            },
            CoreError::AuthorizationDenied { point_id, .. } => {
                CliError::AuthorizationDenied { point_id }
            }
            CoreError::CommandRejected { point_id, code } => {
                CliError::CommandRejected { point_id, code }
            }
            CoreError::BackoffActive { retry_after, until } => CliError::CoolingDown {
                retry_after: humantime::format_duration(retry_after).to_string(),
                until: until.to_rfc3339(),
            },
            CoreError::Closed => CliError::Closed,
            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoUsername { profile } | ConfigError::MissingSecret { profile, .. } => {
                CliError::NoCredentials { profile }
            }
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
