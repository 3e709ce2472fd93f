//! # higoal
//!
//! Rust client for Higoal smart switches, dimmers and blinds.
//!
//! ## Features
//!
//! - Sign-in and device discovery through the vendor cloud API
//! - Persistent relay connection with automatic reconnect
//! - Per-device state and offline tracking from status frames
//! - Change notifications through listeners or an event channel
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use higoal::{Config, EventChannel, Manager};
//!
//! #[tokio::main]
//! async fn main() -> higoal::Result<()> {
//!     let manager = Manager::new(Config::new("user@example.com", "password"))?;
//!
//!     // Load devices and open the relay connection
//!     for device in manager.get_devices().await? {
//!         println!("{}", device);
//!     }
//!     let (events, mut rx) = EventChannel::new();
//!     manager.add_listener(Arc::new(events));
//!     manager.start_streaming().await?;
//!
//!     while let Some(event) = rx.recv().await {
//!         println!("{:?}", event);
//!     }
//!
//!     manager.stop().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod device;
pub mod entity;
pub mod error;
pub mod listener;
pub mod manager;
pub mod registry;

// Re-exports
pub use api::Api;
pub use config::Config;
pub use device::Device;
pub use entity::Entity;
pub use error::{Error, Result};
pub use listener::{EventChannel, Listener, ManagerEvent};
pub use manager::Manager;
pub use registry::{ListDiff, StatusOutcome};

// Re-export protocol types
pub use higoal_core::{Clock, DeviceKey, EntityKind, Frame, ManualClock, Session, SystemClock};
pub use higoal_transport::{BrokerConfig, Transport};
pub use higoal_types::DeviceRecord;
