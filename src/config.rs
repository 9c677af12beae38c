//! Converter configuration

use crate::error::ConvertError;
use crate::types::Manufacturer;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to do with an activity whose sport category cannot be exported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedPolicy {
    /// Log and return an unsupported outcome
    #[default]
    Skip,
    /// Fail the conversion with [`ConvertError::UnsupportedSport`]
    Report,
}

/// Device identity stamped into the file id and device info messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceIdentity {
    pub manufacturer: Manufacturer,
    pub product: u16,
    pub serial_number: u32,
    pub product_name: String,
    pub software_version: f64,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            manufacturer: Manufacturer::Development,
            product: 1,
            serial_number: 9_131_870,
            product_name: crate::PRODUCT_NAME.to_string(),
            software_version: 1.0,
        }
    }
}

/// Configuration for a conversion run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub unsupported_policy: UnsupportedPolicy,
    pub device: DeviceIdentity,
}

impl ConverterConfig {
    /// Parse a configuration document; missing keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ConvertError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConvertError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn with_unsupported_policy(mut self, policy: UnsupportedPolicy) -> Self {
        self.unsupported_policy = policy;
        self
    }
}
