//! Token session
//!
//! Holds the identity returned by the cloud sign-in: user id, token and the
//! home ids. The three fields are set and cleared together. A session older
//! than its maximum age counts as signed out and is cleared on the next check.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    clock::{Clock, SystemClock},
    error::{Error, Result},
};

/// Identity issued at sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: String,
    pub token: String,
    pub home_ids: Vec<String>,
    pub issued_at: DateTime<Utc>,
}

impl Credentials {
    fn is_complete(&self) -> bool {
        !self.user_id.is_empty() && !self.token.is_empty() && !self.home_ids.is_empty()
    }
}

/// Token session
///
/// Thread-safe and can be cloned cheaply (Arc internally).
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    credentials: RwLock<Option<Credentials>>,
    max_age: Duration,
    clock: Arc<dyn Clock>,
}

impl Session {
    /// Default token lifetime
    pub fn default_max_age() -> Duration {
        Duration::hours(1)
    }

    /// Create a signed-out session using the wall clock
    pub fn new() -> Self {
        Self::with_clock(Self::default_max_age(), Arc::new(SystemClock))
    }

    /// Create a signed-out session with a custom lifetime and clock
    pub fn with_clock(max_age: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                credentials: RwLock::new(None),
                max_age,
                clock,
            }),
        }
    }

    /// Current time on the session clock
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Check if the session holds a complete, unexpired identity
    ///
    /// An expired identity is cleared as a side effect.
    pub fn is_signed_in(&self) -> bool {
        let now = self.now();
        let mut credentials = self.inner.credentials.write();

        let expired = credentials
            .as_ref()
            .is_some_and(|c| now - c.issued_at >= self.inner.max_age);
        if expired {
            debug!("Session token expired");
            *credentials = None;
            return false;
        }

        credentials.as_ref().is_some_and(Credentials::is_complete)
    }

    /// Store a fresh identity stamped with the current time
    pub fn set(&self, user_id: String, token: String, home_ids: Vec<String>) {
        let credentials = Credentials {
            user_id,
            token,
            home_ids,
            issued_at: self.now(),
        };
        *self.inner.credentials.write() = Some(credentials);
    }

    /// Clear the identity
    pub fn reset(&self) {
        *self.inner.credentials.write() = None;
    }

    /// Snapshot of the signed-in identity
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSignedIn`] if the session is signed out or expired.
    pub fn credentials(&self) -> Result<Credentials> {
        if !self.is_signed_in() {
            return Err(Error::NotSignedIn);
        }
        self.inner
            .credentials
            .read()
            .clone()
            .ok_or(Error::NotSignedIn)
    }

    /// Current token
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSignedIn`] if the session is signed out or expired.
    pub fn token(&self) -> Result<String> {
        self.credentials().map(|c| c.token)
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.credentials.read().as_ref().map(|c| c.user_id.clone())
    }

    pub fn home_ids(&self) -> Vec<String> {
        self.inner
            .credentials
            .read()
            .as_ref()
            .map(|c| c.home_ids.clone())
            .unwrap_or_default()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
