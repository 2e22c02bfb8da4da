//! Control module - device configuration.
//!
//! The device configuration carries everything the default services answer
//! with (OSD name, vendor id, physical address, ...) plus the adapter's
//! role, logical address and exchange wait time.
//!
//! # Example
//!
//! ```ignore
//! use cec_control::control::DeviceConfig;
//!
//! let config = DeviceConfig::load("/etc/cec/device.json")?;
//! ```

mod config;

pub use config::{DeviceConfig, DEFAULT_WAIT_TIME_MS};
