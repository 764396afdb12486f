// ── Runtime connection configuration ──
//
// Describes how to reach one JabloNET account. Carries credentials and
// tuning but never touches disk: the CLI resolves profiles and hands a
// finished `ControllerConfig` in.

use std::time::Duration;

use jablonet_api::{Credentials, DEFAULT_BASE_URL};
use url::Url;

/// Per-call timeout used when the caller does not supply one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Cooldown armed after a failed recovery login (30 minutes).
pub const DEFAULT_RETRY_COOLDOWN: Duration = Duration::from_secs(1800);

/// Configuration for one logical connection.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Service root, `https://www.jablonet.net` unless overridden.
    pub base_url: Url,
    /// Account credentials, including the optional device selector.
    pub credentials: Credentials,
    /// Bound on every single HTTP call.
    pub timeout: Duration,
    /// How long calls are refused after a recovery login fails.
    pub retry_cooldown: Duration,
}

impl ControllerConfig {
    /// Config pointing at the public service with the documented fallbacks.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            credentials,
            timeout: DEFAULT_TIMEOUT,
            retry_cooldown: DEFAULT_RETRY_COOLDOWN,
        }
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_cooldown(mut self, cooldown: Duration) -> Self {
        self.retry_cooldown = cooldown;
        self
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn new_uses_documented_fallbacks() {
        let config = ControllerConfig::new(Credentials::new(
            "user@example.com",
            SecretString::from("pw".to_string()),
        ));
        assert_eq!(config.base_url.as_str(), "https://www.jablonet.net/");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry_cooldown, Duration::from_secs(1800));
        assert!(config.credentials.service_id().is_none());
    }
}
