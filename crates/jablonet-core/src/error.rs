// ── Core error types ──
//
// What callers of `Controller` see. Transport-layer detail from
// `jablonet_api::Error` is folded into these variants by the `From` impl
// below; only login failures keep their own kind.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Recoverable (drive the re-login path) ────────────────────────
    /// Network failure, timeout, unexpected HTTP status or malformed body.
    #[error("JabloNET request failed: {message}")]
    Transport { message: String },

    /// The server answered `status: 300`.
    #[error("JabloNET session expired")]
    SessionExpired,

    // ── User-actionable ──────────────────────────────────────────────
    /// The login sequence failed, either on first use or during recovery.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The control code was rejected. Never retried.
    #[error("Control code rejected for point {point_id} (authorization {outcome})")]
    AuthorizationDenied { point_id: String, outcome: i64 },

    /// The panel refused to execute an authorized command.
    #[error("Command rejected for point {point_id} (response code {code})")]
    CommandRejected { point_id: String, code: i64 },

    /// The retry gate is closed after a failed recovery login.
    #[error("Cooling down after a failed re-login, retry in {}s", retry_after.as_secs())]
    BackoffActive {
        retry_after: Duration,
        until: DateTime<Utc>,
    },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Connection closed")]
    Closed,

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` when the caller should prompt for new credentials.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    /// Remaining cooldown, if this is a [`BackoffActive`](Self::BackoffActive).
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::BackoffActive { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<jablonet_api::Error> for CoreError {
    fn from(err: jablonet_api::Error) -> Self {
        match err {
            jablonet_api::Error::Authentication { step, message } => {
                CoreError::AuthenticationFailed {
                    message: format!("{step}: {message}"),
                }
            }
            jablonet_api::Error::SessionExpired => CoreError::SessionExpired,
            jablonet_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            other => CoreError::Transport {
                message: other.to_string(),
            },
        }
    }
}
