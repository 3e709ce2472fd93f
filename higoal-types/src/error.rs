//! Wire record errors

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Record cannot be addressed on the wire
    #[error("Invalid device record: {0}")]
    InvalidRecord(String),

    #[error("Device {device}: invalid button type {code:?} at position {index}")]
    InvalidButtonType {
        device: String,
        code: String,
        index: usize,
    },
}
