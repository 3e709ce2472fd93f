//! Error types for higoal-core

/// Result type alias for higoal-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Buffer is not exactly one frame long
    #[error("Invalid frame length: expected {expected} bytes, got {actual} bytes")]
    InvalidFrameLength {
        expected: usize,
        actual: usize,
    },

    /// Vendor device id could not be turned into a numeric wire id
    #[error("Invalid device id: {0:?}")]
    InvalidDeviceId(String),

    /// Device type must be a positive value
    #[error("Invalid device type: {0}")]
    InvalidDeviceType(i64),

    /// Session token is too short or not hex
    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    /// Entity slot does not fit into a frame
    #[error("Entity index {index} out of range (max: {max})")]
    EntityOutOfRange {
        index: usize,
        max: usize,
    },

    /// Session has no token yet
    #[error("Session not signed in")]
    NotSignedIn,
}
