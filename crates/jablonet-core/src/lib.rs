//! Connection logic between `jablonet-api` and front ends.
//!
//! - **[`Controller`]** — owns one session, one retry gate, and one
//!   snapshot store per account. Every operation goes through a single
//!   recover-once executor: log in if needed, call, and on any failure
//!   clear the session, log in again and call exactly once more.
//!
//! - **[`RetryGate`]** — armed only when a *recovery* login fails;
//!   refuses calls with [`CoreError::BackoffActive`] until the cooldown
//!   elapses. Cleared by every success.
//!
//! - **[`SnapshotStore`]** — latest [`Snapshot`] behind a `watch`
//!   channel. Control results patch one point; fetches that were in
//!   flight when a control completed are discarded.

pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod gate;
pub mod model;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ControllerConfig, DEFAULT_RETRY_COOLDOWN, DEFAULT_TIMEOUT};
pub use controller::Controller;
pub use error::CoreError;
pub use gate::{Clock, ManualClock, RetryGate, SystemClock};
pub use model::{Category, ControlResult, PointRecord, PointState, SWITCH_REACTION, Snapshot};
pub use store::{FetchTicket, SnapshotStore};

pub use jablonet_api::{Credentials, SessionState};
