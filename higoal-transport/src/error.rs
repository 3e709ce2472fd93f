//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Timed out connecting to relay")]
    ConnectionTimeout,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Auth frame could not be built
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Frame error: {0}")]
    Frame(#[from] higoal_core::Error),
}

impl Error {
    /// Check if the failure is a network condition worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionTimeout | Self::Io(_))
    }
}
