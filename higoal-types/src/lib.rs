//! Wire records for the Higoal cloud API

pub mod de;
pub mod device_record;
pub mod error;
pub mod login;
pub mod model;

pub use device_record::{ButtonSlot, DeviceRecord};
pub use error::{Error, Result};
pub use login::{ApiEnvelope, HomeRecord, LoginData};
pub use model::model_name;
