//! Cloud HTTP API
//!
//! Sign-in and device-list retrieval. Both endpoints take url-encoded form
//! bodies and answer with a JSON `{ "repData": ... }` envelope.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info};

use higoal_core::{build_auth_frame, Credentials, Frame, Session};
use higoal_transport::Authenticator;
use higoal_types::{ApiEnvelope, DeviceRecord, LoginData};

use crate::config::Config;
use crate::error::{Error, Result};

/// HTTP client for the vendor cloud
pub struct Api {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: SecretString,
    version: String,
    session: Session,
    sign_in_lock: Mutex<()>,
}

impl Api {
    /// Create a client using the API settings of `config`
    pub fn new(config: &Config, session: Session) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self::with_client(http, config, session))
    }

    /// Create a client with a pre-built `reqwest::Client`
    pub fn with_client(http: reqwest::Client, config: &Config, session: Session) -> Self {
        Self {
            http,
            base_url: config.api_url(),
            username: config.username.clone(),
            password: SecretString::from(config.password.expose_secret().to_string()),
            version: config.version.clone(),
            session,
            sign_in_lock: Mutex::new(()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_signed_in()
    }

    /// Sign in unless the session is already signed in and fresh
    ///
    /// Concurrent callers wait for a single sign-in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] when the response carries no token,
    /// no user id or no home.
    pub async fn sign_in(&self) -> Result<()> {
        if self.session.is_signed_in() {
            return Ok(());
        }

        let _guard = self.sign_in_lock.lock().await;
        if self.session.is_signed_in() {
            return Ok(());
        }

        debug!(username = %self.username, "Signing in");
        let form = [
            ("password", self.password.expose_secret()),
            ("username", self.username.as_str()),
            ("ver", self.version.as_str()),
        ];
        let data: LoginData = self.post("login", &form).await?.unwrap_or_default();

        let token = data.token.clone().ok_or_else(|| Error::Authentication {
            message: "no token in sign-in response".to_string(),
        })?;
        let user_id = data.uid.clone().ok_or_else(|| Error::Authentication {
            message: "no user id in sign-in response".to_string(),
        })?;
        let home_ids = data.home_ids();
        if home_ids.is_empty() {
            return Err(Error::Authentication {
                message: "account has no homes".to_string(),
            });
        }

        info!(homes = home_ids.len(), "Signed in");
        self.session.set(user_id, token, home_ids);
        Ok(())
    }

    /// Drop the current token
    pub fn reset(&self) {
        self.session.reset();
    }

    /// Fetch the devices of one home
    pub async fn fetch_host_list(
        &self,
        home_id: &str,
        credentials: &Credentials,
    ) -> Result<Vec<DeviceRecord>> {
        let form = [
            ("homeId", home_id),
            ("token", credentials.token.as_str()),
            ("uid", credentials.user_id.as_str()),
        ];
        let records: Vec<DeviceRecord> = self.post("get_host_list", &form).await?.unwrap_or_default();
        debug!(home = home_id, count = records.len(), "Fetched host list");
        Ok(records)
    }

    /// Fetch the devices of every home, signing in first if needed
    pub async fn fetch_devices(&self) -> Result<Vec<DeviceRecord>> {
        self.sign_in().await?;
        let credentials = self.session.credentials()?;

        let mut records = Vec::new();
        for home_id in &credentials.home_ids {
            records.extend(self.fetch_host_list(home_id, &credentials).await?);
        }
        Ok(records)
    }

    /// POST a form and unwrap the `repData` envelope
    async fn post<T: DeserializeOwned>(&self, path: &str, form: &[(&str, &str)]) -> Result<Option<T>> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("POST {}", url);

        let resp = self.http.post(&url).form(form).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        let envelope: ApiEnvelope<T> =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;
        Ok(envelope.rep_data)
    }
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("signed_in", &self.session.is_signed_in())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Authenticator for Api {
    async fn auth_frame(&self) -> anyhow::Result<Frame> {
        self.sign_in().await?;
        let token = self.session.token()?;
        Ok(build_auth_frame(&token)?)
    }

    async fn invalidate(&self) {
        debug!("Invalidating session token");
        self.reset();
    }
}
