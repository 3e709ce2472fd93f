//! Persistent relay connection
//!
//! The broker keeps exactly one relay connection alive. Every connection
//! starts with the auth frame; after that a background task reads frames and
//! hands each to all registered handlers. A closed stream or a read error
//! triggers a reconnect; a read error also invalidates the session token.
//!
//! # Example
//!
//! ```rust,ignore
//! let broker = MessageBroker::new(transport, authenticator, BrokerConfig::default());
//! broker.add_handler(handler);
//!
//! if broker.connect().await {
//!     broker.send(&frame).await;
//! }
//!
//! broker.stop().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex as SyncMutex, RwLock};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use higoal_core::Frame;

use crate::{
    error::{Error, Result},
    framed::{FrameReader, FrameWriter},
    Authenticator, FrameHandler, Transport,
};

/// Broker timing
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Wait between failed connection attempts. Default: 5s.
    pub retry_interval: Duration,

    /// Pause after every sent frame; the relay drops frames sent faster.
    /// Default: 250ms.
    pub send_interval: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_secs(5),
            send_interval: Duration::from_millis(250),
        }
    }
}

impl BrokerConfig {
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_send_interval(mut self, interval: Duration) -> Self {
        self.send_interval = interval;
        self
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Socket writer and state, always changed together
struct Link {
    writer: Option<FrameWriter>,
    state: ConnectionState,
}

/// Relay connection with reconnect and handler fan-out
pub struct MessageBroker {
    inner: Arc<BrokerInner>,
}

struct BrokerInner {
    transport: Arc<dyn Transport>,
    authenticator: Arc<dyn Authenticator>,
    config: BrokerConfig,
    link: Mutex<Link>,
    handlers: RwLock<Vec<Arc<dyn FrameHandler>>>,
    cancel: CancellationToken,
    task: SyncMutex<Option<JoinHandle<()>>>,
}

impl MessageBroker {
    pub fn new(
        transport: Arc<dyn Transport>,
        authenticator: Arc<dyn Authenticator>,
        config: BrokerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                transport,
                authenticator,
                config,
                link: Mutex::new(Link {
                    writer: None,
                    state: ConnectionState::Disconnected,
                }),
                handlers: RwLock::new(Vec::new()),
                cancel: CancellationToken::new(),
                task: SyncMutex::new(None),
            }),
        }
    }

    /// Register a handler for inbound frames
    pub fn add_handler(&self, handler: Arc<dyn FrameHandler>) {
        self.inner.handlers.write().push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.read().len()
    }

    /// Get current connection state
    pub async fn state(&self) -> ConnectionState {
        self.inner.link.lock().await.state
    }

    /// Check if connected
    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    /// Check if [`stop`](Self::stop) has been called
    pub fn is_stopped(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Connect to the relay, retrying until connected or stopped
    ///
    /// Returns `true` once the auth frame has been sent and the receive loop
    /// is running, `false` if the broker was stopped first.
    pub async fn connect(&self) -> bool {
        {
            let task = self.inner.task.lock();
            if task.as_ref().is_some_and(|t| !t.is_finished()) {
                warn!("Already connected");
                return true;
            }
        }

        let Some(reader) = self.inner.establish().await else {
            return false;
        };
        if self.inner.cancel.is_cancelled() {
            self.inner.teardown().await;
            return false;
        }

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(inner.run(reader));
        *self.inner.task.lock() = Some(handle);
        true
    }

    /// Send one frame
    ///
    /// Returns `false` if not connected or the write failed. Senders are
    /// serialized and each send holds the connection for the send interval.
    pub async fn send(&self, frame: &Frame) -> bool {
        self.inner.send(frame).await
    }

    /// Stop the broker
    ///
    /// Clears the handlers, closes the connection and ends any retry wait or
    /// pending read. Calling it again has no effect.
    pub async fn stop(&self) {
        debug!("stop");
        self.inner.handlers.write().clear();
        self.inner.cancel.cancel();
        self.inner.teardown().await;
        // The receive loop exits on its own once cancelled
        drop(self.inner.task.lock().take());
    }
}

impl Drop for MessageBroker {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

impl BrokerInner {
    async fn establish(&self) -> Option<FrameReader> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.teardown().await;
                    return None;
                }
                result = self.open_link() => result,
            };

            match result {
                Ok(reader) => return Some(reader),
                Err(e) => {
                    warn!(
                        error = %e,
                        attempt,
                        addr = %self.transport.remote_addr(),
                        "Failed to connect"
                    );
                    self.teardown().await;
                }
            }

            debug!(
                delay_ms = self.config.retry_interval.as_millis() as u64,
                attempt,
                "Waiting before reconnect"
            );
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                _ = tokio::time::sleep(self.config.retry_interval) => {}
            }

            debug!("Retrying connection to {}", self.transport.remote_addr());
        }
    }

    /// Open a connection and complete the handshake
    async fn open_link(&self) -> Result<FrameReader> {
        self.link.lock().await.state = ConnectionState::Connecting;

        let addr = self.transport.remote_addr();
        debug!("Connecting to {}...", addr);
        let (reader, mut writer) = self.transport.open().await?;

        let auth = self
            .authenticator
            .auth_frame()
            .await
            .map_err(|e| Error::Handshake(e.to_string()))?;

        let mut link = self.link.lock().await;
        writer.write_frame(&auth).await?;
        link.writer = Some(writer);
        link.state = ConnectionState::Connected;
        info!("Connected to {}", addr);

        tokio::time::sleep(self.config.send_interval).await;
        Ok(reader)
    }

    async fn teardown(&self) {
        let mut link = self.link.lock().await;
        if let Some(mut writer) = link.writer.take() {
            writer.shutdown().await;
            info!("Disconnected from {}", self.transport.remote_addr());
        }
        link.state = ConnectionState::Disconnected;
    }

    async fn send(&self, frame: &Frame) -> bool {
        let mut link = self.link.lock().await;
        if link.state != ConnectionState::Connected {
            warn!("Not connected to relay");
            return false;
        }
        let Some(writer) = link.writer.as_mut() else {
            return false;
        };

        if let Err(e) = writer.write_frame(frame).await {
            error!(error = %e, "Failed to send frame");
            return false;
        }

        tokio::time::sleep(self.config.send_interval).await;
        true
    }

    async fn run(self: Arc<Self>, mut reader: FrameReader) {
        info!("Receive loop started for {}", self.transport.remote_addr());

        loop {
            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                read = reader.read_frame() => read,
            };

            match read {
                Ok(Some(frame)) => {
                    self.dispatch(&frame).await;
                    continue;
                }
                Ok(None) => info!("Relay closed connection"),
                Err(e) => {
                    error!(error = %e, "Error in receive loop");
                    self.authenticator.invalidate().await;
                }
            }

            self.teardown().await;
            match self.establish().await {
                Some(next) => reader = next,
                None => break,
            }
        }

        self.teardown().await;
        info!("Receive loop ended");
    }

    async fn dispatch(&self, frame: &Frame) {
        let handlers = self.handlers.read().clone();
        if handlers.is_empty() {
            trace!("No handler for frame: {:?}", frame);
            return;
        }

        for handler in handlers {
            if let Err(e) = handler.on_frame(frame).await {
                error!(error = %e, "Error in frame handler");
            }
        }
    }
}
