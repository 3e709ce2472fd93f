//! # higoal-core
//!
//! Core protocol implementation for Higoal smart switches and blinds.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame structure and checksum
//! - Command and auth frame builders
//! - Vendor device-id decoding
//! - Token session with expiry
//! - Protocol constants

pub mod auth;
pub mod checksum;
pub mod clock;
pub mod command;
pub mod constants;
pub mod device_id;
pub mod error;
pub mod frame;
pub mod session;

pub use auth::build_auth_frame;
pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{build_action_command, build_percentage_command, build_status_request};
pub use constants::EntityKind;
pub use device_id::encode_device_id;
pub use error::{Error, Result};
pub use frame::{DeviceKey, Frame, FRAME_LEN};
pub use session::{Credentials, Session};
