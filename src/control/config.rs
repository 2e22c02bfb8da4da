//! Device configuration.
//!
//! Describes the identity this device answers with. Loaded from JSON;
//! every field has a default so partial files are fine.
//!
//! # Example
//!
//! ```
//! use cec_control::control::DeviceConfig;
//! use cec_control::protocol::{AdapterRole, LogicalAddress};
//!
//! let config = DeviceConfig::from_json(r#"{
//!     "role": "tv",
//!     "logical_address": 0,
//!     "osd_name": "Living Room",
//!     "menu_language": "eng"
//! }"#).unwrap();
//!
//! assert_eq!(config.role, AdapterRole::Tv);
//! assert_eq!(config.logical_address().unwrap(), LogicalAddress::Tv);
//! assert_eq!(config.menu_language_code(), Some(*b"eng"));
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CecError, Result};
use crate::handler::messages::{PowerState, CEC_VERSION_1_4, MAX_OSD_NAME};
use crate::protocol::{AdapterRole, LogicalAddress};

/// Default time to wait for an answer (1.5 s).
pub const DEFAULT_WAIT_TIME_MS: u64 = 1500;

/// Identity and timing of the local device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Role this device acts as.
    pub role: AdapterRole,
    /// Claimed logical address (raw, 0x0-0xF).
    #[serde(rename = "logical_address")]
    pub logical_address_raw: u8,
    /// Name reported in `<Set OSD Name>`.
    pub osd_name: String,
    /// 24-bit vendor id reported in `<Device Vendor ID>`.
    pub vendor_id: u32,
    /// Physical address reported in `<Report Physical Address>`.
    pub physical_address: u16,
    /// Operand of `<CEC Version>`.
    pub cec_version: u8,
    /// Operand of `<Report Power Status>`.
    pub power_status: PowerState,
    /// ISO 639-2 menu language, answered only by a TV.
    pub menu_language: Option<String>,
    /// Exchange wait time in milliseconds.
    pub wait_time_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            role: AdapterRole::Playback,
            logical_address_raw: LogicalAddress::Playback1.raw(),
            osd_name: "Metrological".to_string(),
            vendor_id: 0x000D36,
            physical_address: 0x1000,
            cec_version: CEC_VERSION_1_4,
            power_status: PowerState::On,
            menu_language: None,
            wait_time_ms: DEFAULT_WAIT_TIME_MS,
        }
    }
}

impl DeviceConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<()> {
        let address = self.logical_address()?;

        if address.is_broadcast() && self.role != AdapterRole::Switch {
            return Err(CecError::Protocol(format!(
                "Role {:?} cannot use the unregistered address",
                self.role
            )));
        }

        if self.osd_name.is_empty() || self.osd_name.len() > MAX_OSD_NAME {
            return Err(CecError::Protocol(format!(
                "OSD name must be 1-{} bytes, got {}",
                MAX_OSD_NAME,
                self.osd_name.len()
            )));
        }

        if self.vendor_id > 0x00FF_FFFF {
            return Err(CecError::Protocol(format!(
                "Vendor id {:#x} exceeds 24 bits",
                self.vendor_id
            )));
        }

        if let Some(language) = &self.menu_language {
            if language.len() != 3 || !language.is_ascii() {
                return Err(CecError::Protocol(format!(
                    "Menu language must be a 3 letter code, got {language:?}"
                )));
            }
        }

        if self.wait_time_ms == 0 {
            return Err(CecError::Protocol("Wait time must be non-zero".to_string()));
        }

        Ok(())
    }

    /// Claimed logical address.
    pub fn logical_address(&self) -> Result<LogicalAddress> {
        LogicalAddress::from_raw(self.logical_address_raw)
    }

    /// Menu language as the three operand bytes.
    pub fn menu_language_code(&self) -> Option<[u8; 3]> {
        let bytes = self.menu_language.as_ref()?.as_bytes();
        <[u8; 3]>::try_from(bytes).ok()
    }

    /// Exchange wait time.
    pub fn wait_time(&self) -> Duration {
        Duration::from_millis(self.wait_time_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = DeviceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.wait_time(), Duration::from_millis(1500));
        assert_eq!(config.logical_address().unwrap(), LogicalAddress::Playback1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = DeviceConfig::from_json(r#"{ "osd_name": "Box" }"#).unwrap();

        assert_eq!(config.osd_name, "Box");
        assert_eq!(config.role, AdapterRole::Playback);
        assert_eq!(config.vendor_id, 0x000D36);
    }

    #[test]
    fn test_power_status_names() {
        let config = DeviceConfig::from_json(r#"{ "power_status": "transition_to_on" }"#).unwrap();
        assert_eq!(config.power_status, PowerState::TransitionToOn);
    }

    #[test]
    fn test_rejects_bad_address() {
        let result = DeviceConfig::from_json(r#"{ "logical_address": 16 }"#);
        assert!(matches!(result, Err(CecError::InvalidAddress(16))));

        let result = DeviceConfig::from_json(r#"{ "logical_address": 15 }"#);
        assert!(matches!(result, Err(CecError::Protocol(_))));

        let result = DeviceConfig::from_json(r#"{ "role": "switch", "logical_address": 15 }"#);
        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_long_name() {
        let result = DeviceConfig::from_json(r#"{ "osd_name": "Fifteen chars!!" }"#);
        assert!(matches!(result, Err(CecError::Protocol(_))));
    }

    #[test]
    fn test_rejects_bad_language() {
        let result = DeviceConfig::from_json(r#"{ "menu_language": "english" }"#);
        assert!(matches!(result, Err(CecError::Protocol(_))));
    }

    #[test]
    fn test_rejects_wide_vendor_id() {
        let result = DeviceConfig::from_json(r#"{ "vendor_id": 16777216 }"#);
        assert!(matches!(result, Err(CecError::Protocol(_))));
    }

    #[test]
    fn test_malformed_json() {
        let result = DeviceConfig::from_json("{ not json");
        assert!(matches!(result, Err(CecError::Json(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "role": "tuner", "logical_address": 3 }}"#).unwrap();

        let config = DeviceConfig::load(file.path()).unwrap();
        assert_eq!(config.role, AdapterRole::Tuner);
        assert_eq!(config.logical_address().unwrap(), LogicalAddress::Tuner1);
    }

    #[test]
    fn test_load_missing_file() {
        let result = DeviceConfig::load("/nonexistent/cec-device.json");
        assert!(matches!(result, Err(CecError::Io(_))));
    }
}
