//! TCP transport to the relay

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use higoal_core::constants::DEFAULT_RELAY_PORT;

use crate::{
    error::*,
    framed::{FrameReader, FrameWriter},
    Transport,
};

/// TCP transport opening a fresh relay connection per [`Transport::open`]
#[derive(Debug, Clone)]
pub struct TcpTransport {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Default connection timeout
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create new TCP transport
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Transport to the default relay port on `host`
    pub fn relay(host: impl Into<String>) -> Self {
        Self::new(host, DEFAULT_RELAY_PORT)
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Resolve address to SocketAddr
    async fn resolve_addr(&self) -> Result<SocketAddr> {
        let addr_str = self.remote_addr();

        let mut addrs = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?;

        addrs
            .next()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(&self) -> Result<(FrameReader, FrameWriter)> {
        let addr = timeout(self.connect_timeout, self.resolve_addr())
            .await
            .map_err(|_| Error::ConnectionTimeout)??;

        debug!("Connecting to {}...", addr);

        let stream = timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectionTimeout)?
            .map_err(Error::Io)?;

        stream.set_nodelay(true)?;

        debug!("Connected to {}", addr);

        let (read, write) = stream.into_split();
        Ok((FrameReader::new(read), FrameWriter::new(write)))
    }

    fn remote_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
