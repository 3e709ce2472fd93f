//! Client configuration

use std::time::Duration;

use secrecy::SecretString;

use higoal_core::constants::{CLIENT_VERSION, DEFAULT_API_PORT, DEFAULT_DOMAIN, DEFAULT_RELAY_PORT};
use higoal_transport::BrokerConfig;

use crate::error::{Error, Result};

/// Environment variable holding the account user name
pub const ENV_USERNAME: &str = "HIGOAL_USERNAME";

/// Environment variable holding the account password
pub const ENV_PASSWORD: &str = "HIGOAL_PASSWORD";

/// Optional environment variable overriding the vendor domain
pub const ENV_DOMAIN: &str = "HIGOAL_DOMAIN";

/// Account and connection settings
///
/// Intervals compared against the session clock are `chrono` durations;
/// timeouts awaited on the runtime are `std` durations.
#[derive(Debug)]
pub struct Config {
    /// Vendor domain serving both the API and the relay
    pub domain: String,

    pub api_port: u16,

    pub relay_port: u16,

    /// Client version reported at sign-in
    pub version: String,

    pub username: String,

    pub password: SecretString,

    /// Full API base URL, overriding `https://{domain}:{api_port}`
    pub api_base_url: Option<String>,

    /// Relay host, overriding `domain`
    pub relay_host: Option<String>,

    pub http_timeout: Duration,

    pub connect_timeout: Duration,

    /// Token lifetime before a fresh sign-in is forced. Default: 1h.
    pub token_max_age: chrono::Duration,

    /// Re-poll interval for offline devices. Default: 30s.
    pub poll_interval: chrono::Duration,

    /// How long a status frame from an unknown sender suppresses further
    /// device-list refreshes for it. Default: 60s.
    pub unknown_retry_interval: chrono::Duration,

    /// Send attempts per entity action. Default: 3.
    pub command_attempts: u32,

    pub broker: BrokerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            api_port: DEFAULT_API_PORT,
            relay_port: DEFAULT_RELAY_PORT,
            version: CLIENT_VERSION.to_string(),
            username: String::new(),
            password: SecretString::from(String::new()),
            api_base_url: None,
            relay_host: None,
            http_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            token_max_age: chrono::Duration::hours(1),
            poll_interval: chrono::Duration::seconds(30),
            unknown_retry_interval: chrono::Duration::seconds(60),
            command_attempts: 3,
            broker: BrokerConfig::default(),
        }
    }
}

impl Config {
    /// Default settings for an account
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            ..Self::default()
        }
    }

    /// Read the account from `HIGOAL_USERNAME` / `HIGOAL_PASSWORD`, and the
    /// domain from `HIGOAL_DOMAIN` when set
    pub fn from_env() -> Result<Self> {
        let username = std::env::var(ENV_USERNAME)
            .map_err(|_| Error::Config(format!("{ENV_USERNAME} is not set")))?;
        let password = std::env::var(ENV_PASSWORD)
            .map_err(|_| Error::Config(format!("{ENV_PASSWORD} is not set")))?;

        let mut config = Self::new(username, password);
        if let Ok(domain) = std::env::var(ENV_DOMAIN) {
            if !domain.trim().is_empty() {
                config.domain = domain.trim().to_string();
            }
        }
        Ok(config)
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_api_port(mut self, port: u16) -> Self {
        self.api_port = port;
        self
    }

    pub fn with_relay_port(mut self, port: u16) -> Self {
        self.relay_port = port;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn with_relay_host(mut self, host: impl Into<String>) -> Self {
        self.relay_host = Some(host.into());
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_token_max_age(mut self, max_age: chrono::Duration) -> Self {
        self.token_max_age = max_age;
        self
    }

    pub fn with_poll_interval(mut self, interval: chrono::Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_unknown_retry_interval(mut self, interval: chrono::Duration) -> Self {
        self.unknown_retry_interval = interval;
        self
    }

    pub fn with_command_attempts(mut self, attempts: u32) -> Self {
        self.command_attempts = attempts.max(1);
        self
    }

    pub fn with_broker(mut self, broker: BrokerConfig) -> Self {
        self.broker = broker;
        self
    }

    /// API base URL without trailing slash
    pub fn api_url(&self) -> String {
        match &self.api_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}:{}", self.domain, self.api_port),
        }
    }

    /// Host the relay connection is opened to
    pub fn relay_host(&self) -> &str {
        self.relay_host.as_deref().unwrap_or(&self.domain)
    }
}
