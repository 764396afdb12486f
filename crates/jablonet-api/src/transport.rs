// Shared transport configuration for building the reqwest::Client.
//
// The client is always built with the session store as its cookie
// provider; the JabloNET web session lives entirely in cookies.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::error::Error;
use crate::session::SessionStore;

/// The public JabloNET web endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.jablonet.net";

/// The web frontend rejects non-browser user agents on some endpoints.
pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:145.0) Gecko/20100101 Firefox/145.0";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-call timeout. Never infinite.
    pub timeout: Duration,
    /// Session store to install as the cookie provider. A fresh one is
    /// created when `None`.
    pub session: Option<Arc<SessionStore>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            session: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` wired to the given session store.
    pub fn build_client(&self, session: &Arc<SessionStore>) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .cookie_provider(Arc::clone(session))
            .build()
            .map_err(Error::Transport)
    }

    /// Use a specific session store (e.g. one shared with a test harness).
    pub fn with_session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }
}
