//! Transport layer for the Higoal relay
//!
//! Provides the TCP connection to the relay and the [`MessageBroker`] that
//! keeps it alive.

pub mod broker;
pub mod error;
pub mod framed;
pub mod tcp;

pub use broker::{BrokerConfig, ConnectionState, MessageBroker};
pub use error::{Error, Result};
pub use framed::{FrameReader, FrameWriter};
pub use tcp::TcpTransport;

use async_trait::async_trait;
use higoal_core::Frame;

/// Source of relay connections
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a fresh connection
    async fn open(&self) -> Result<(FrameReader, FrameWriter)>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}

/// Supplies the handshake frame sent first on every connection
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Build the auth frame, signing in first if needed
    async fn auth_frame(&self) -> anyhow::Result<Frame>;

    /// Drop the current token so the next handshake signs in again
    async fn invalidate(&self);
}

/// Receiver of inbound frames
#[async_trait]
pub trait FrameHandler: Send + Sync {
    async fn on_frame(&self, frame: &Frame) -> anyhow::Result<()>;
}
