use secrecy::SecretString;
use strum::Display;

/// Credentials for one JabloNET account.
///
/// Immutable once handed to a connection; replacing them must wipe the
/// session (see `jablonet_core::Controller::update_credentials`).
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Login identity (usually the account e-mail).
    pub username: String,
    pub password: SecretString,
    /// Optional service id selecting one alarm panel when the account
    /// has several. `None` lets the server pick its default.
    pub service_id: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
            service_id: None,
        }
    }

    /// Select a specific panel. Empty strings are treated as "no selector".
    pub fn with_service_id(mut self, service_id: impl Into<String>) -> Self {
        let id = service_id.into();
        self.service_id = (!id.trim().is_empty()).then_some(id);
        self
    }

    /// The device selector, if one is configured.
    pub fn service_id(&self) -> Option<&str> {
        self.service_id.as_deref()
    }
}

/// The four steps of the web login sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LoginStep {
    /// Unauthenticated GET of the service root; issues the primary token.
    #[strum(to_string = "homepage")]
    Homepage,
    /// Form POST of the credentials.
    #[strum(to_string = "credentials")]
    Credentials,
    /// GET of the /cloud page; issues the mode token.
    #[strum(to_string = "cloud page")]
    CloudPage,
    /// GET of the device app page; scopes the session to the panel.
    #[strum(to_string = "device init")]
    DeviceInit,
}
