// JabloNET HTTP client
//
// Wraps `reqwest::Client` with endpoint construction, browser-style ajax
// headers, and classification of the `{ "status": N, ... }` envelope.
// Endpoint operations (login, status, control) live in sibling modules
// as inherent methods so this file stays focused on transport mechanics.

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::session::SessionStore;
use crate::transport::TransportConfig;

/// `status` value for a successful data or control call.
pub const STATUS_OK: i64 = 200;

/// `status` value the server uses to signal an expired session.
pub const STATUS_SESSION_EXPIRED: i64 = 300;

/// Raw HTTP client for the JabloNET web API.
///
/// Owns exactly one [`SessionStore`]. Performs no retries: the retry and
/// re-login policy belongs to `jablonet-core`.
pub struct JablonetClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<SessionStore>,
    timeout_secs: u64,
}

impl JablonetClient {
    /// Create a client for the given service root (e.g. `https://www.jablonet.net`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let session = transport
            .session
            .clone()
            .unwrap_or_else(|| Arc::new(SessionStore::new()));
        let http = transport.build_client(&session)?;
        Ok(Self {
            http,
            base_url,
            session,
            timeout_secs: transport.timeout.as_secs(),
        })
    }

    /// The session store backing this client's cookies.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// The service root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Join an absolute path onto the service root.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// The device app page, optionally scoped to a service id.
    pub(crate) fn device_page_url(&self, service_id: Option<&str>) -> Result<Url, Error> {
        let mut url = self.endpoint(crate::login::DEVICE_INIT_PATH)?;
        if let Some(id) = service_id {
            url.query_pairs_mut().append_pair("service", id);
        }
        Ok(url)
    }

    // ── Headers ──────────────────────────────────────────────────────

    /// Headers the web frontend sends on its XHR calls.
    pub(crate) fn ajax_headers(&self, referer: &Url) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert(
            "x-requested-with",
            HeaderValue::from_static("XMLHttpRequest"),
        );
        if let Ok(origin) = HeaderValue::from_str(&self.base_url.origin().ascii_serialization()) {
            headers.insert(header::ORIGIN, origin);
        }
        if let Ok(referer) = HeaderValue::from_str(referer.as_str()) {
            headers.insert(header::REFERER, referer);
        }
        headers
    }

    /// Headers for full page navigations (homepage, /cloud, app page).
    pub(crate) fn page_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            "upgrade-insecure-requests",
            HeaderValue::from_static("1"),
        );
        headers
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// GET a page and require HTTP 200. The body is drained and returned.
    pub(crate) async fn get_page(&self, url: Url) -> Result<String, Error> {
        debug!("GET {}", url);

        let path = url.path().to_owned();
        let resp = self
            .http
            .get(url)
            .headers(Self::page_headers())
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, self.timeout_secs))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(e, self.timeout_secs))?;

        if status != StatusCode::OK {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                path,
            });
        }
        Ok(body)
    }

    /// POST a form and return the raw HTTP status and body.
    pub(crate) async fn post_form_raw(
        &self,
        url: Url,
        form: &[(&str, &str)],
        referer: &Url,
    ) -> Result<(StatusCode, String), Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .headers(self.ajax_headers(referer))
            .form(form)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, self.timeout_secs))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(e, self.timeout_secs))?;
        trace!(%status, len = body.len(), "response received");
        Ok((status, body))
    }

    /// POST a form to a data or control endpoint and classify the envelope.
    pub(crate) async fn post_envelope(
        &self,
        url: Url,
        form: &[(&str, &str)],
        referer: &Url,
    ) -> Result<Value, Error> {
        let path = url.path().to_owned();
        let (status, body) = self.post_form_raw(url, form, referer).await?;
        classify_envelope(status.as_u16(), &path, &body, STATUS_OK)
    }
}

/// Classify a response from a data or control endpoint.
///
/// - HTTP status other than 200 → [`Error::HttpStatus`]
/// - body is not JSON → [`Error::Deserialization`]
/// - `status == 300` → [`Error::SessionExpired`]
/// - `status == expected` → `Ok(body)`
/// - anything else → [`Error::UnexpectedStatus`]
pub fn classify_envelope(
    http_status: u16,
    path: &str,
    body: &str,
    expected: i64,
) -> Result<Value, Error> {
    if http_status != StatusCode::OK.as_u16() {
        return Err(Error::HttpStatus {
            status: http_status,
            path: path.to_owned(),
        });
    }

    let value: Value = serde_json::from_str(body).map_err(|e| {
        let preview = body.chars().take(200).collect::<String>();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })?;

    match envelope_status(&value) {
        Some(STATUS_SESSION_EXPIRED) => Err(Error::SessionExpired),
        Some(status) if status == expected => Ok(value),
        status => Err(Error::UnexpectedStatus { status, expected }),
    }
}

/// Read the `status` field, accepting numbers and numeric strings.
pub(crate) fn envelope_status(value: &Value) -> Option<i64> {
    crate::models::lenient_i64(value.get("status")?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_returns_body() {
        let body = r#"{"status":200,"pgm":{}}"#;
        let value = classify_envelope(200, "/stav.php", body, STATUS_OK).expect("ok");
        assert!(value.get("pgm").is_some());
    }

    #[test]
    fn status_300_is_session_expired() {
        let err = classify_envelope(200, "/stav.php", r#"{"status":300}"#, STATUS_OK)
            .expect_err("expired");
        assert!(err.is_session_expired());
    }

    #[test]
    fn string_status_is_accepted() {
        let err = classify_envelope(200, "/stav.php", r#"{"status":"300"}"#, STATUS_OK)
            .expect_err("expired");
        assert!(err.is_session_expired());
    }

    #[test]
    fn missing_status_is_unexpected() {
        let err = classify_envelope(200, "/stav.php", r#"{"pgm":{}}"#, STATUS_OK)
            .expect_err("no status");
        assert!(matches!(
            err,
            Error::UnexpectedStatus {
                status: None,
                expected: 200
            }
        ));
    }

    #[test]
    fn html_body_is_deserialization_error() {
        let err = classify_envelope(200, "/stav.php", "<html>login</html>", STATUS_OK)
            .expect_err("html");
        assert!(matches!(err, Error::Deserialization { .. }));
    }

    #[test]
    fn non_200_http_status_wins_over_body() {
        let err = classify_envelope(502, "/stav.php", r#"{"status":200}"#, STATUS_OK)
            .expect_err("bad gateway");
        assert!(matches!(err, Error::HttpStatus { status: 502, .. }));
    }
}
