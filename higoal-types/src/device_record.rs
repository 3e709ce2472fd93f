//! Device list records

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    de,
    error::{Error, Result},
    model::model_name,
};

/// One entry of `POST /get_host_list`
///
/// A device ("host") is one physical unit; its buttons are described by two
/// parallel lists, `;`-joined names and `,`-joined type codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Vendor-encoded device id
    #[serde(default, deserialize_with = "de::string")]
    pub id: String,

    #[serde(rename = "type", default, deserialize_with = "de::integer")]
    pub device_type: i64,

    #[serde(default, deserialize_with = "de::string")]
    pub name: String,

    #[serde(default, deserialize_with = "de::string")]
    pub room_id: String,

    #[serde(default, deserialize_with = "de::string")]
    pub home_id: String,

    #[serde(default, deserialize_with = "de::string")]
    pub ssid: String,

    #[serde(default, deserialize_with = "de::string")]
    pub mac: String,

    #[serde(default, deserialize_with = "de::string")]
    pub version: String,

    #[serde(default, deserialize_with = "de::string")]
    pub button_name: String,

    #[serde(default, deserialize_with = "de::string")]
    pub button_type: String,
}

/// A populated button position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSlot {
    /// Position in the button lists (also the frame slot)
    pub index: usize,
    pub name: String,
    /// Vendor button-type code, never 0
    pub code: u8,
}

impl DeviceRecord {
    /// Model name for this device's type
    pub fn model_name(&self) -> &'static str {
        model_name(self.device_type)
    }

    /// Populated button positions
    ///
    /// Positions past the shorter of the two lists are ignored, as are
    /// positions with type code 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidButtonType`] when a type code is not a small integer.
    pub fn button_slots(&self) -> Result<Vec<ButtonSlot>> {
        if self.button_type.trim().is_empty() {
            return Ok(Vec::new());
        }

        let names = self.button_name.split(';');
        let codes = self.button_type.split(',');

        let mut slots = Vec::new();
        for (index, (name, code)) in names.zip(codes).enumerate() {
            let code: u8 = code.trim().parse().map_err(|_| Error::InvalidButtonType {
                device: self.id.clone(),
                code: code.to_string(),
                index,
            })?;
            if code == 0 {
                continue;
            }
            slots.push(ButtonSlot {
                index,
                name: name.to_string(),
                code,
            });
        }
        Ok(slots)
    }

    /// Check that the record can be addressed on the wire
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] for an empty id or non-positive type.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidRecord("device id is empty".to_string()));
        }
        if self.device_type <= 0 {
            return Err(Error::InvalidRecord(format!(
                "device {} has invalid type {}",
                self.id, self.device_type
            )));
        }
        Ok(())
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device[{}: {} ({})]",
            self.id,
            self.name,
            self.model_name()
        )
    }
}
