// ── Controller ──
//
// One logical connection to one JabloNET account. Every operation runs
// the same sequence under a single async mutex so the session is never
// observed half-rebuilt:
//
//   gate check → ensure login → call → on failure: clear, re-login once,
//   call once more → return that outcome as-is.
//
// A failed recovery login arms the retry gate. A failed first login
// does not.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jablonet_api::{
    ControlRequest, ControlResponse, Credentials, JablonetClient, OUTCOME_OK, SessionState,
    SessionStore, StatusPayload, TransportConfig,
};
use secrecy::SecretString;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::convert::{epoch_to_utc, point_state, snapshot_from_payload};
use crate::error::CoreError;
use crate::gate::{Clock, RetryGate, SystemClock};
use crate::model::{ControlResult, PointState, Snapshot};
use crate::store::SnapshotStore;

// ── Operations ───────────────────────────────────────────────────

/// Session-bound state guarded by the connection mutex.
struct Connection {
    client: JablonetClient,
    credentials: Credentials,
}

/// One logical API call the executor can run, retry, and recover.
trait ApiOperation: Sync {
    type Output: Send;
    const NAME: &'static str;

    fn call(
        &self,
        conn: &Connection,
    ) -> impl Future<Output = Result<Self::Output, jablonet_api::Error>> + Send;
}

struct FetchStatus;

impl ApiOperation for FetchStatus {
    type Output = StatusPayload;
    const NAME: &'static str = "fetch status";

    async fn call(&self, conn: &Connection) -> Result<StatusPayload, jablonet_api::Error> {
        conn.client.fetch_status(conn.credentials.service_id()).await
    }
}

struct SendControl {
    request: ControlRequest,
}

impl ApiOperation for SendControl {
    type Output = ControlResponse;
    const NAME: &'static str = "control";

    async fn call(&self, conn: &Connection) -> Result<ControlResponse, jablonet_api::Error> {
        conn.client
            .send_control(&self.request, conn.credentials.service_id())
            .await
    }
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable; all clones share one session, one retry gate, and
/// one snapshot store.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    connection: Mutex<Connection>,
    session: Arc<SessionStore>,
    gate: RetryGate,
    store: SnapshotStore,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl Controller {
    /// Create a controller. Does not touch the network; the first
    /// operation logs in.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Like [`new`](Self::new) with an injected time source for the gate.
    pub fn with_clock(config: ControllerConfig, clock: Arc<dyn Clock>) -> Result<Self, CoreError> {
        let session = Arc::new(SessionStore::new());
        let transport = TransportConfig {
            timeout: config.timeout,
            ..TransportConfig::default()
        }
        .with_session(Arc::clone(&session));
        let client = JablonetClient::new(config.base_url, &transport)?;

        Ok(Self {
            inner: Arc::new(ControllerInner {
                connection: Mutex::new(Connection {
                    client,
                    credentials: config.credentials,
                }),
                session,
                gate: RetryGate::new(config.retry_cooldown, Arc::clone(&clock)),
                store: SnapshotStore::new(),
                clock,
                cancel: CancellationToken::new(),
            }),
        })
    }

    // ── Public operations ────────────────────────────────────────

    /// Fetch the full panel state and publish it.
    ///
    /// If a control command completes while this fetch is in flight, the
    /// patched snapshot is returned instead of the fetched one.
    pub async fn fetch_snapshot(&self) -> Result<Arc<Snapshot>, CoreError> {
        let ticket = self.inner.store.begin_fetch();
        let payload = self.execute(&FetchStatus).await?;
        let snapshot = snapshot_from_payload(&payload, self.inner.clock.now());
        debug!(points = snapshot.point_count(), "snapshot fetched");
        Ok(self.inner.store.apply_fetch(ticket, snapshot))
    }

    /// Switch a programmable output and reconcile the local snapshot.
    ///
    /// The returned state is the one the server reports after executing
    /// the command, which may differ from `target`. A rejected control
    /// code is an [`AuthorizationDenied`](CoreError::AuthorizationDenied)
    /// and leaves the session untouched.
    pub async fn control(
        &self,
        point_id: &str,
        target: PointState,
        code: &SecretString,
    ) -> Result<ControlResult, CoreError> {
        let state_name = self.resolve_state_name(point_id);
        let op = SendControl {
            request: ControlRequest {
                point_id: point_id.to_owned(),
                state_name: state_name.clone(),
                target: target.0,
                code: code.clone(),
            },
        };

        let response = self.execute(&op).await?;

        if response.authorization != OUTCOME_OK {
            warn!(point = point_id, outcome = response.authorization, "control code rejected");
            return Err(CoreError::AuthorizationDenied {
                point_id: point_id.to_owned(),
                outcome: response.authorization,
            });
        }
        if response.response_code != OUTCOME_OK {
            warn!(point = point_id, code = response.response_code, "command rejected");
            return Err(CoreError::CommandRejected {
                point_id: point_id.to_owned(),
                code: response.response_code,
            });
        }

        let state = response.stav.and_then(point_state).unwrap_or_else(|| {
            warn!(point = point_id, "control response carried no state, assuming target");
            target
        });
        let changed_at = response.ts.and_then(epoch_to_utc);
        if !self.inner.store.apply_control(point_id, state, changed_at) {
            debug!(point = point_id, "controlled point not in current snapshot");
        }

        info!(point = point_id, requested = %target, resulting = %state, "control applied");
        Ok(ControlResult {
            point_id: point_id.to_owned(),
            state_name,
            state,
            authorization: response.authorization,
            response_code: response.response_code,
        })
    }

    /// When the retry gate reopens, if it is armed.
    pub fn next_retry_allowed_at(&self) -> Option<DateTime<Utc>> {
        self.inner.gate.next_allowed_at()
    }

    /// Run a bare login to check credentials. Does not affect the gate.
    pub async fn verify_credentials(&self) -> Result<(), CoreError> {
        self.guarded(async {
            let conn = self.inner.connection.lock().await;
            conn.client.login(&conn.credentials).await?;
            Ok(())
        })
        .await
    }

    /// Replace the credentials. Wipes the session and reopens the gate.
    pub async fn update_credentials(&self, credentials: Credentials) {
        let mut conn = self.inner.connection.lock().await;
        conn.credentials = credentials;
        self.inner.session.clear();
        self.inner.gate.clear();
        info!("credentials updated, session discarded");
    }

    /// Cancel in-flight calls and wipe the session. Later operations
    /// fail with [`CoreError::Closed`].
    pub async fn close(&self) {
        self.inner.cancel.cancel();
        let _conn = self.inner.connection.lock().await;
        self.inner.session.clear();
        debug!("connection closed");
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// Create a controller, run `f`, close.
    pub async fn oneshot<F, Fut, T>(config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let controller = Controller::new(config)?;
        let result = f(controller.clone()).await;
        controller.close().await;
        result
    }

    /// One-shot fetch through the normal path, used to enumerate points.
    pub async fn discover(config: ControllerConfig) -> Result<Arc<Snapshot>, CoreError> {
        Self::oneshot(config, |controller| async move { controller.fetch_snapshot().await }).await
    }

    // ── State observation ────────────────────────────────────────

    /// Latest delivered snapshot.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.store.latest()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.inner.store.subscribe()
    }

    pub fn session_state(&self) -> SessionState {
        self.inner.session.state()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ── Executor ─────────────────────────────────────────────────

    async fn execute<O: ApiOperation>(&self, op: &O) -> Result<O::Output, CoreError> {
        self.guarded(self.execute_locked(op)).await
    }

    /// Race `fut` against `close()`. Dropping the future cancels any
    /// in-flight request; the session is only mutated after a call
    /// completes.
    async fn guarded<T>(
        &self,
        fut: impl Future<Output = Result<T, CoreError>>,
    ) -> Result<T, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Closed);
        }
        tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => Err(CoreError::Closed),
            result = fut => result,
        }
    }

    async fn execute_locked<O: ApiOperation>(&self, op: &O) -> Result<O::Output, CoreError> {
        let conn = self.inner.connection.lock().await;
        self.inner.gate.admit()?;

        if !self.inner.session.is_established() {
            debug!(operation = O::NAME, "no session, logging in");
            conn.client.login(&conn.credentials).await?;
        }

        let first_err = match op.call(&conn).await {
            Ok(output) => {
                self.inner.gate.clear();
                return Ok(output);
            }
            Err(err) => err,
        };

        warn!(operation = O::NAME, error = %first_err, "call failed, re-authenticating");
        self.inner.session.clear();

        if let Err(err) = conn.client.login(&conn.credentials).await {
            let until = self.inner.gate.arm();
            warn!(%until, error = %err, "recovery login failed, backing off");
            return Err(err.into());
        }

        let output = op.call(&conn).await?;
        self.inner.gate.clear();
        info!(operation = O::NAME, "recovered after re-login");
        Ok(output)
    }

    /// `stateName` for a PGM id, from the latest snapshot or by convention.
    fn resolve_state_name(&self, point_id: &str) -> String {
        self.inner
            .store
            .latest()
            .and_then(|snap| snap.programmable_output(point_id)?.state_name.clone())
            .unwrap_or_else(|| format!("PGM_{point_id}"))
    }
}
