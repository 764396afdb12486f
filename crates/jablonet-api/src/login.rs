// Web login sequence
//
// JabloNET has no token endpoint: a session is assembled by replaying what
// a browser does. Root page → credential POST → /cloud → device app page.
// Every step must succeed; any failure wipes the session so callers never
// observe a half-built cookie pair as a success.

use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use crate::auth::{Credentials, LoginStep};
use crate::client::{JablonetClient, STATUS_OK};
use crate::error::Error;
use crate::session::{MODE_COOKIE, PRIMARY_COOKIE};

pub(crate) const LOGIN_PATH: &str = "/ajax/login.php";
pub(crate) const CLOUD_PATH: &str = "/cloud";
pub(crate) const DEVICE_INIT_PATH: &str = "/app/ja100";

impl JablonetClient {
    /// Clear the session and run the full four-step login.
    ///
    /// On success the session is [`Established`](crate::SessionState::Established).
    /// On failure it is [`Absent`](crate::SessionState::Absent) and the error is
    /// always [`Error::Authentication`] naming the failed step. No retries.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), Error> {
        info!(user = %credentials.username, "logging in to JabloNET");
        self.session().clear();

        match self.login_steps(credentials).await {
            Ok(()) => {
                info!("login complete, session established");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "login failed, discarding partial session");
                self.session().clear();
                Err(err)
            }
        }
    }

    async fn login_steps(&self, credentials: &Credentials) -> Result<(), Error> {
        // 1. Root page issues the primary token.
        let root = self.endpoint("/").map_err(step_err(LoginStep::Homepage))?;
        self.get_page(root.clone())
            .await
            .map_err(step_err(LoginStep::Homepage))?;
        self.require_cookie(PRIMARY_COOKIE, LoginStep::Homepage)?;
        debug!("homepage visited, primary token issued");

        // 2. Credential POST. The token may be rotated here.
        self.post_credentials(credentials, &root).await?;
        self.require_cookie(PRIMARY_COOKIE, LoginStep::Credentials)?;
        debug!("credentials accepted");

        // 3. /cloud issues the mode token.
        let cloud = self
            .endpoint(CLOUD_PATH)
            .map_err(step_err(LoginStep::CloudPage))?;
        self.get_page(cloud)
            .await
            .map_err(step_err(LoginStep::CloudPage))?;
        self.require_cookie(MODE_COOKIE, LoginStep::CloudPage)?;
        debug!("cloud page visited, mode token issued");

        // 4. Device app page scopes the session to the panel.
        let device = self
            .device_page_url(credentials.service_id())
            .map_err(step_err(LoginStep::DeviceInit))?;
        self.get_page(device)
            .await
            .map_err(step_err(LoginStep::DeviceInit))?;
        self.session().mark_device_scoped();
        debug!(service_id = ?credentials.service_id(), "device page initialized");

        Ok(())
    }

    /// Step 2. Succeeds on HTTP 200 unless the body is JSON carrying a
    /// non-200 `status`; plain-text and empty bodies are accepted.
    async fn post_credentials(&self, credentials: &Credentials, root: &url::Url) -> Result<(), Error> {
        let url = self
            .endpoint(LOGIN_PATH)
            .map_err(step_err(LoginStep::Credentials))?;
        let form = [
            ("login", credentials.username.as_str()),
            ("heslo", credentials.password.expose_secret()),
            ("aStatus", "200"),
            ("loginType", "Login"),
        ];

        let (status, body) = self
            .post_form_raw(url, &form, root)
            .await
            .map_err(step_err(LoginStep::Credentials))?;

        if status != reqwest::StatusCode::OK {
            return Err(Error::Authentication {
                step: LoginStep::Credentials,
                message: format!("login rejected (HTTP {status})"),
            });
        }

        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(api_status) = crate::client::envelope_status(&json) {
                if api_status != STATUS_OK {
                    return Err(Error::Authentication {
                        step: LoginStep::Credentials,
                        message: format!("login rejected (API status {api_status})"),
                    });
                }
            }
        }

        Ok(())
    }

    fn require_cookie(&self, name: &str, step: LoginStep) -> Result<(), Error> {
        if self.session().cookie(name).is_some() {
            Ok(())
        } else {
            Err(Error::Authentication {
                step,
                message: format!("server did not issue the {name} cookie"),
            })
        }
    }
}

/// Wrap any step failure as an [`Error::Authentication`] for that step.
fn step_err(step: LoginStep) -> impl Fn(Error) -> Error {
    move |err| match err {
        Error::Authentication { .. } => err,
        other => Error::Authentication {
            step,
            message: other.to_string(),
        },
    }
}
