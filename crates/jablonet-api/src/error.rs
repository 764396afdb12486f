use thiserror::Error;

use crate::auth::LoginStep;

/// Top-level error type for the `jablonet-api` crate.
///
/// The JabloNET web API answers HTTP 200 for almost everything and reports
/// the real outcome in a `status` field of the JSON body. This enum keeps
/// the distinctions visible for diagnostics; `jablonet-core` collapses
/// everything except [`Authentication`](Self::Authentication) into one
/// recoverable failure kind.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// One step of the login sequence failed. The session is left empty.
    #[error("Authentication failed at {step}: {message}")]
    Authentication { step: LoginStep, message: String },

    /// The server answered `status: 300` -- the cookie session is gone.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Non-200 HTTP status on an endpoint that always answers 200.
    #[error("Unexpected HTTP status {status} from {path}")]
    HttpStatus { status: u16, path: String },

    // ── Envelope ────────────────────────────────────────────────────
    /// JSON body parsed, but `status` was missing or not the expected value.
    #[error("Unexpected API status {status:?} (expected {expected})")]
    UnexpectedStatus { status: Option<i64>, expected: i64 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` for the explicit `status: 300` expiry signal.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` if the login sequence itself failed.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient network-level error.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Map a `reqwest` error into [`Timeout`](Self::Timeout) when it is one.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_secs }
        } else {
            Self::Transport(err)
        }
    }
}
