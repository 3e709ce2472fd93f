//! High-level error types

use higoal_core::DeviceKey;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] higoal_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] higoal_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] higoal_types::Error),

    /// Sign-in rejected or returned no usable identity
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned HTTP {status}")]
    Api { status: u16 },

    /// Response body could not be decoded, with the raw body for debugging
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown device {0}")]
    UnknownDevice(DeviceKey),

    #[error("Device {device} has no entity {index}")]
    UnknownEntity { device: DeviceKey, index: usize },

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Not streaming")]
    NotStreaming,

    #[error("Failed to send command after {attempts} attempts")]
    SendFailed { attempts: u32 },
}

impl Error {
    /// Check if this is a transient network error worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status } => *status >= 500,
            Self::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if signing in again might resolve this error
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::Core(higoal_core::Error::NotSignedIn)
        )
    }
}
