// Session store
//
// The JabloNET web session is two cooperating cookies: `PHPSESSID`
// (required on every call) and `lastMode` (issued by the /cloud page,
// required for device-scoped calls). The store is installed as the
// reqwest cookie provider so harvesting is automatic, and it can be
// inspected and wiped atomically, which `reqwest::cookie::Jar` cannot.
//
// Parsing, domain/path scoping and expiry are delegated to
// `cookie_store`, the same jar reqwest uses internally.

use std::fmt;
use std::sync::RwLock;

use cookie::Cookie;
use cookie_store::CookieStore as CookieJar;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use tracing::trace;
use url::Url;

/// Cookie carrying the primary session token.
pub const PRIMARY_COOKIE: &str = "PHPSESSID";

/// Cookie carrying the mode token that scopes calls to a device.
pub const MODE_COOKIE: &str = "lastMode";

/// Observable lifecycle of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No primary token.
    Absent,
    /// Primary token present but the login sequence has not completed
    /// (mode token missing or device initialization not confirmed).
    Partial,
    /// Both tokens present and the device-init page confirmed the session.
    Established,
}

#[derive(Default)]
struct SessionInner {
    jar: CookieJar,
    device_scoped: bool,
}

impl SessionInner {
    /// Unexpired value of `name`, whatever domain or path it is scoped to.
    fn value(&self, name: &str) -> Option<&str> {
        self.jar
            .iter_unexpired()
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value())
    }
}

/// Owned cookie session for one logical connection.
///
/// Never share one store between two connections: login wipes it.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<SessionInner>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        let inner = self.inner.read().expect("session lock poisoned");
        let primary = inner.value(PRIMARY_COOKIE).is_some();
        let mode = inner.value(MODE_COOKIE).is_some();
        match (primary, mode, inner.device_scoped) {
            (false, _, _) => SessionState::Absent,
            (true, true, true) => SessionState::Established,
            _ => SessionState::Partial,
        }
    }

    /// Whether the session looks usable for device-scoped calls.
    pub fn is_established(&self) -> bool {
        self.state() == SessionState::Established
    }

    /// The primary token, if any. Exposed for diagnostics and tests.
    pub fn primary_token(&self) -> Option<String> {
        self.cookie(PRIMARY_COOKIE)
    }

    /// The mode token, if any.
    pub fn mode_token(&self) -> Option<String> {
        self.cookie(MODE_COOKIE)
    }

    /// Look up any unexpired cookie by name.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let inner = self.inner.read().expect("session lock poisoned");
        inner.value(name).map(str::to_owned)
    }

    /// Wipe every cookie and the device-scope flag in one step.
    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("session lock poisoned");
        inner.jar.clear();
        inner.device_scoped = false;
        trace!("session cleared");
    }

    /// Record that the device-init endpoint accepted this session.
    pub(crate) fn mark_device_scoped(&self) {
        self.inner.write().expect("session lock poisoned").device_scoped = true;
    }
}

impl CookieStore for SessionStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let parsed = cookie_headers.filter_map(|header| {
            let raw = header.to_str().ok()?;
            Cookie::parse(raw.to_owned()).ok()
        });

        let mut inner = self.inner.write().expect("session lock poisoned");
        inner.jar.store_response_cookies(parsed, url);

        // A server-side deletion of either token ends the device scope.
        if inner.value(PRIMARY_COOKIE).is_none() || inner.value(MODE_COOKIE).is_none() {
            inner.device_scoped = false;
        }
        trace!(%url, "response cookies stored");
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let inner = self.inner.read().expect("session lock poisoned");
        let mut pairs: Vec<(&str, &str)> = inner.jar.get_request_values(url).collect();
        if pairs.is_empty() {
            return None;
        }
        pairs.sort_unstable();
        let joined = pairs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined).ok()
    }
}
