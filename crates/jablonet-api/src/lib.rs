//! Async client for the Jablotron JabloNET web API.
//!
//! The web API has no formal session endpoint. A session is two cookies
//! assembled by a four-step browser-style login ([`JablonetClient::login`])
//! and kept in an owned [`SessionStore`]. All responses are HTTP 200 with
//! the real outcome in a `status` field; [`classify_envelope`] turns that
//! into a typed [`Error`].
//!
//! This crate performs no retries. The re-login and backoff policy lives
//! in `jablonet-core`.

pub mod auth;
pub mod client;
pub mod control;
pub mod error;
pub mod login;
pub mod models;
pub mod session;
pub mod status;
pub mod transport;

pub use auth::{Credentials, LoginStep};
pub use client::{JablonetClient, classify_envelope};
pub use control::ControlRequest;
pub use error::Error;
pub use models::{ControlResponse, OUTCOME_OK, RawPoint, StatusPayload};
pub use session::{SessionState, SessionStore};
pub use transport::{DEFAULT_BASE_URL, TransportConfig};
