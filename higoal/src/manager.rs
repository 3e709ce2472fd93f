//! Device manager
//!
//! Ties the HTTP API, the relay broker and the device registry together.
//! The manager registers itself as the broker's frame handler; every inbound
//! frame first drives the offline re-poll and is then routed to its device.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, trace, warn};

use higoal_core::{Clock, DeviceKey, Frame, Session, SystemClock};
use higoal_transport::{Authenticator, BrokerConfig, FrameHandler, MessageBroker, TcpTransport, Transport};

use crate::api::Api;
use crate::config::Config;
use crate::device::Device;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::listener::Listener;
use crate::registry::{build_devices, ListDiff, Registry, StatusOutcome};

/// Entry point for device discovery, state tracking and control
#[derive(Clone)]
pub struct Manager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    api: Arc<Api>,
    transport: Arc<dyn Transport>,
    broker_config: BrokerConfig,
    clock: Arc<dyn Clock>,
    registry: Mutex<Registry>,
    broker: RwLock<Option<Arc<MessageBroker>>>,
    /// Serializes broker restarts
    streaming: tokio::sync::Mutex<()>,
    listeners: RwLock<Vec<Arc<dyn Listener>>>,
    command_attempts: u32,
}

/// Broker handler forwarding frames to the manager
struct FrameSink {
    manager: Weak<ManagerInner>,
}

#[async_trait]
impl FrameHandler for FrameSink {
    async fn on_frame(&self, frame: &Frame) -> anyhow::Result<()> {
        let Some(manager) = self.manager.upgrade() else {
            return Ok(());
        };
        manager.on_frame_received(frame).await?;
        Ok(())
    }
}

impl Manager {
    /// Create a manager talking to the vendor cloud and relay from `config`
    pub fn new(config: Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let session = Session::with_clock(config.token_max_age, Arc::clone(&clock));
        let api = Arc::new(Api::new(&config, session)?);
        let transport = Arc::new(
            TcpTransport::new(config.relay_host(), config.relay_port)
                .with_connect_timeout(config.connect_timeout),
        );
        Ok(Self::with_parts(&config, api, transport, clock))
    }

    /// Create a manager from pre-built parts
    ///
    /// The clock drives offline polling and unknown-sender expiry; pass the
    /// same clock the API session uses.
    pub fn with_parts(
        config: &Config,
        api: Arc<Api>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                api,
                transport,
                broker_config: config.broker.clone(),
                clock,
                registry: Mutex::new(Registry::new(
                    config.poll_interval,
                    config.unknown_retry_interval,
                )),
                broker: RwLock::new(None),
                streaming: tokio::sync::Mutex::new(()),
                listeners: RwLock::new(Vec::new()),
                command_attempts: config.command_attempts.max(1),
            }),
        }
    }

    pub fn api(&self) -> &Api {
        &self.inner.api
    }

    /// Register a change listener
    pub fn add_listener(&self, listener: Arc<dyn Listener>) {
        self.inner.listeners.write().push(listener);
    }

    /// Sign in and load the device list, replacing any known devices
    ///
    /// Every device starts offline until its first status reply.
    pub async fn get_devices(&self) -> Result<Vec<Device>> {
        let records = self.inner.api.fetch_devices().await?;
        let devices = build_devices(&records);
        let now = self.inner.clock.now();
        let mut registry = self.inner.registry.lock();
        registry.replace(devices, now);
        Ok(registry.devices())
    }

    /// Fetch the device list again and merge it
    ///
    /// Listeners are not notified; the caller announces the diff.
    pub async fn refresh_device_list(&self) -> Result<ListDiff> {
        self.inner.refresh_device_list().await
    }

    /// (Re)open the relay connection and request the state of every device
    ///
    /// Waits until connected. Fails with [`Error::NotStreaming`] when
    /// [`stop`](Self::stop) is called in the meantime.
    pub async fn start_streaming(&self) -> Result<()> {
        self.inner.start_streaming().await
    }

    /// Process one inbound frame
    pub async fn on_frame_received(&self, frame: &Frame) -> Result<()> {
        self.inner.on_frame_received(frame).await
    }

    /// Send a raw frame once
    ///
    /// Returns `false` without a broker or when the write failed.
    pub async fn send_command(&self, frame: &Frame) -> bool {
        self.inner.send_command(frame).await
    }

    /// Send the entity's on action
    pub async fn turn_on(&self, key: DeviceKey, index: usize) -> Result<()> {
        let frame = self
            .inner
            .entity_frame(key, index, |device, entity| device.action_frame(index, entity.on_action()))?;
        self.inner.send_with_retry(frame).await
    }

    /// Send the entity's off action
    pub async fn turn_off(&self, key: DeviceKey, index: usize) -> Result<()> {
        let frame = self
            .inner
            .entity_frame(key, index, |device, entity| device.action_frame(index, entity.off_action()))?;
        self.inner.send_with_retry(frame).await
    }

    /// Set a dimmer to `fraction` (`0.0..=1.0`)
    pub async fn set_percentage(&self, key: DeviceKey, index: usize, fraction: f64) -> Result<()> {
        let value = ((fraction * 100.0) as i64).clamp(0, 100) as u8;
        let frame = self
            .inner
            .entity_frame(key, index, |device, _| device.percentage_frame(index, value))?;
        self.inner.send_with_retry(frame).await
    }

    /// Ask the relay for the current state of one device
    pub async fn request_status(&self, key: DeviceKey) -> Result<()> {
        let frame = self.inner.status_request(key)?;
        if self.inner.send_command(&frame).await {
            Ok(())
        } else {
            Err(Error::NotStreaming)
        }
    }

    /// Snapshot of all devices, ordered by key
    pub fn devices(&self) -> Vec<Device> {
        self.inner.registry.lock().devices()
    }

    pub fn device(&self, key: DeviceKey) -> Option<Device> {
        self.inner.registry.lock().device(&key).cloned()
    }

    pub fn entity(&self, key: DeviceKey, index: usize) -> Option<Entity> {
        self.inner
            .registry
            .lock()
            .device(&key)
            .and_then(|device| device.entity(index).cloned())
    }

    /// Shutter partner of an entity, see [`Device::related_entity`]
    pub fn related_entity(&self, key: DeviceKey, index: usize) -> Option<Entity> {
        self.inner
            .registry
            .lock()
            .device(&key)
            .and_then(|device| device.related_entity(index).cloned())
    }

    /// Check if a device is tracked as offline
    pub fn is_offline(&self, key: DeviceKey) -> bool {
        self.inner.registry.lock().is_offline(&key)
    }

    /// Check if the relay connection is up
    pub async fn is_streaming(&self) -> bool {
        let broker = self.inner.broker.read().clone();
        match broker {
            Some(broker) => broker.is_connected().await,
            None => false,
        }
    }

    /// Close the relay connection
    ///
    /// Also aborts a [`start_streaming`](Self::start_streaming) still
    /// waiting to connect.
    pub async fn stop(&self) {
        self.inner.stop_broker().await;
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("api", &self.inner.api)
            .field("relay", &self.inner.transport.remote_addr())
            .field("devices", &self.inner.registry.lock().len())
            .finish_non_exhaustive()
    }
}

impl ManagerInner {
    async fn refresh_device_list(&self) -> Result<ListDiff> {
        let records = self.api.fetch_devices().await?;
        let devices = build_devices(&records);
        let now = self.clock.now();
        Ok(self.registry.lock().apply_device_list(devices, now))
    }

    async fn start_streaming(self: &Arc<Self>) -> Result<()> {
        let _guard = self.streaming.lock().await;

        self.stop_broker().await;
        self.api.sign_in().await?;

        let authenticator: Arc<dyn Authenticator> = self.api.clone();
        let broker = Arc::new(MessageBroker::new(
            Arc::clone(&self.transport),
            authenticator,
            self.broker_config.clone(),
        ));
        broker.add_handler(Arc::new(FrameSink {
            manager: Arc::downgrade(self),
        }));
        // Stored first so stop() can cancel the connect below
        *self.broker.write() = Some(Arc::clone(&broker));

        if !broker.connect().await {
            return Err(Error::NotStreaming);
        }

        let requests = self.registry.lock().status_requests();
        info!(devices = requests.len(), "Streaming started");
        for frame in &requests {
            if !broker.send(frame).await {
                warn!(frame = %frame, "Failed to request device status");
            }
        }
        Ok(())
    }

    async fn stop_broker(&self) {
        let broker = self.broker.write().take();
        if let Some(broker) = broker {
            broker.stop().await;
        }
    }

    async fn send_command(&self, frame: &Frame) -> bool {
        let broker = self.broker.read().clone();
        let Some(broker) = broker else {
            debug!(frame = %frame, "No relay connection, dropping frame");
            return false;
        };
        trace!(frame = %frame, "Sending frame");
        broker.send(frame).await
    }

    async fn send_with_retry(self: &Arc<Self>, frame: Frame) -> Result<()> {
        let attempts = self.command_attempts;
        for attempt in 1..=attempts {
            if self.send_command(&frame).await {
                return Ok(());
            }
            warn!(attempt, attempts, frame = %frame, "Failed to send command");

            if attempt < attempts {
                self.api.reset();
                if let Err(e) = self.start_streaming().await {
                    warn!(error = %e, "Failed to restart streaming");
                }
            }
        }
        error!(attempts, frame = %frame, "Giving up on command");
        Err(Error::SendFailed { attempts })
    }

    fn entity_frame(
        &self,
        key: DeviceKey,
        index: usize,
        build: impl FnOnce(&Device, &Entity) -> Result<Frame>,
    ) -> Result<Frame> {
        let registry = self.registry.lock();
        let device = registry.device(&key).ok_or(Error::UnknownDevice(key))?;
        let entity = device
            .entity(index)
            .ok_or(Error::UnknownEntity { device: key, index })?;
        build(device, entity)
    }

    fn status_request(&self, key: DeviceKey) -> Result<Frame> {
        self.registry
            .lock()
            .device(&key)
            .map(Device::status_request)
            .ok_or(Error::UnknownDevice(key))
    }

    fn take_due_polls(&self) -> Vec<Frame> {
        let now = self.clock.now();
        self.registry.lock().take_due_polls(now)
    }

    fn apply_status(&self, frame: &Frame) -> StatusOutcome {
        let now = self.clock.now();
        self.registry.lock().apply_status(frame, now)
    }

    async fn on_frame_received(&self, frame: &Frame) -> Result<()> {
        for poll in self.take_due_polls() {
            self.send_command(&poll).await;
        }

        if !frame.is_status() {
            trace!(frame = %frame, "Ignoring non-status frame");
            return Ok(());
        }
        trace!(frame = %frame, "Status frame");

        let key = frame.identity();
        let mut redispatched = false;
        loop {
            match self.apply_status(frame) {
                StatusOutcome::Applied(changed) => {
                    for entity in &changed {
                        debug!(device = %key, index = entity.index(), state = entity.state(), "Entity changed");
                        self.notify(|listener| listener.on_entity_changed(entity));
                    }
                    return Ok(());
                }
                StatusOutcome::Pending => {
                    trace!(device = %key, "Dropping frame from pending unknown device");
                    return Ok(());
                }
                StatusOutcome::Unknown => {
                    info!(device = %key, "Status from unknown device, refreshing device list");
                    let diff = match self.refresh_device_list().await {
                        Ok(diff) => diff,
                        Err(e) if e.is_retryable() => {
                            warn!(device = %key, error = %e, "Device list refresh failed, will retry");
                            return Ok(());
                        }
                        Err(e) => return Err(e),
                    };

                    for device in &diff.removed {
                        self.notify(|listener| listener.on_device_removed(device));
                    }
                    for device in &diff.added {
                        self.notify(|listener| listener.on_device_added(device));
                    }

                    if diff.added.is_empty() || redispatched {
                        return Ok(());
                    }
                    redispatched = true;
                }
            }
        }
    }

    fn notify(&self, call: impl Fn(&dyn Listener)) {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            if catch_unwind(AssertUnwindSafe(|| call(listener.as_ref()))).is_err() {
                error!("Listener panicked");
            }
        }
    }
}
