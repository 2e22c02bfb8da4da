//! Standard CEC messages and the default service table.
//!
//! Each message works on both sides: wrapped in
//! [`ServiceType`] it answers requests, wrapped in
//! [`ExchangeType`](crate::exchange::ExchangeType) it sends them and parses
//! the answer.

use std::sync::Arc;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use super::registry::{Processor, ServiceGuard};
use super::service::{Message, ServiceType};
use crate::control::DeviceConfig;
use crate::protocol::{AbortReason, AdapterRole, Opcode, RoleMask};

/// Longest OSD name the standard allows.
pub const MAX_OSD_NAME: usize = 14;

/// `<CEC Version>` operand for 1.4.
pub const CEC_VERSION_1_4: u8 = 0x05;
/// `<CEC Version>` operand for 2.0.
pub const CEC_VERSION_2_0: u8 = 0x06;

/// `<Give Device Vendor ID>` / `<Device Vendor ID>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorId {
    /// 24-bit IEEE OUI.
    pub id: u32,
}

impl VendorId {
    pub fn new(id: u32) -> Self {
        Self { id: id & 0x00FF_FFFF }
    }
}

impl Message for VendorId {
    const REQUEST: Opcode = Opcode::GiveDeviceVendorId;
    const RESPONSE: Opcode = Opcode::DeviceVendorId;

    fn process(&self, buffer: &mut [u8], _length: usize) -> usize {
        buffer[..3].copy_from_slice(&self.id.to_be_bytes()[1..]);
        3
    }

    fn accept(&mut self, operands: &[u8]) -> bool {
        match operands {
            [a, b, c, ..] => {
                self.id = u32::from_be_bytes([0, *a, *b, *c]);
                true
            }
            _ => false,
        }
    }
}

/// `<Give OSD Name>` / `<Set OSD Name>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsdName {
    name: String,
}

impl OsdName {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Message for OsdName {
    const REQUEST: Opcode = Opcode::GiveOsdName;
    const RESPONSE: Opcode = Opcode::SetOsdName;

    fn process(&self, buffer: &mut [u8], _length: usize) -> usize {
        let bytes = self.name.as_bytes();
        let length = bytes.len().min(MAX_OSD_NAME).min(buffer.len());
        buffer[..length].copy_from_slice(&bytes[..length]);
        length
    }

    fn accept(&mut self, operands: &[u8]) -> bool {
        if operands.is_empty() {
            return false;
        }
        self.name = String::from_utf8_lossy(operands).into_owned();
        true
    }
}

/// `<Get CEC Version>` / `<CEC Version>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub version: u8,
}

impl Version {
    pub fn new(version: u8) -> Self {
        Self { version }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new(CEC_VERSION_1_4)
    }
}

impl Message for Version {
    const REQUEST: Opcode = Opcode::GetCecVersion;
    const RESPONSE: Opcode = Opcode::CecVersion;

    fn process(&self, buffer: &mut [u8], _length: usize) -> usize {
        buffer[0] = self.version;
        1
    }

    fn accept(&mut self, operands: &[u8]) -> bool {
        match operands.first() {
            Some(&version) => {
                self.version = version;
                true
            }
            None => false,
        }
    }
}

/// `<Give Physical Address>` / `<Report Physical Address>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhysicalAddress {
    /// Physical address, `a.b.c.d` packed as nibbles.
    pub address: u16,
    /// Primary device type operand.
    pub device_type: u8,
}

impl PhysicalAddress {
    pub fn new(address: u16, role: AdapterRole) -> Self {
        Self {
            address,
            device_type: device_type(role),
        }
    }
}

impl Message for PhysicalAddress {
    const REQUEST: Opcode = Opcode::GivePhysicalAddr;
    const RESPONSE: Opcode = Opcode::ReportPhysicalAddr;

    fn process(&self, buffer: &mut [u8], _length: usize) -> usize {
        buffer[..2].copy_from_slice(&self.address.to_be_bytes());
        buffer[2] = self.device_type;
        3
    }

    fn accept(&mut self, operands: &[u8]) -> bool {
        match operands {
            [hi, lo, device_type, ..] => {
                self.address = u16::from_be_bytes([*hi, *lo]);
                self.device_type = *device_type;
                true
            }
            _ => false,
        }
    }
}

/// Primary device type operand for a role.
pub fn device_type(role: AdapterRole) -> u8 {
    match role {
        AdapterRole::Tv => 0,
        AdapterRole::Recorder => 1,
        AdapterRole::Tuner => 3,
        AdapterRole::Playback => 4,
        AdapterRole::AudioSystem => 5,
        AdapterRole::Switch => 6,
        AdapterRole::VideoProcessor => 7,
        // Reserved value
        AdapterRole::All | AdapterRole::Unknown => 2,
    }
}

/// `<Power Status>` operand.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize,
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    #[default]
    On = 0x00,
    Standby = 0x01,
    TransitionToOn = 0x02,
    TransitionToStandby = 0x03,
}

/// `<Give Device Power Status>` / `<Report Power Status>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PowerStatus {
    pub state: PowerState,
}

impl PowerStatus {
    pub fn new(state: PowerState) -> Self {
        Self { state }
    }
}

impl Message for PowerStatus {
    const REQUEST: Opcode = Opcode::GiveDevicePowerStatus;
    const RESPONSE: Opcode = Opcode::ReportPowerStatus;

    fn process(&self, buffer: &mut [u8], _length: usize) -> usize {
        buffer[0] = self.state.into();
        1
    }

    fn accept(&mut self, operands: &[u8]) -> bool {
        match operands.first().map(|&raw| PowerState::try_from(raw)) {
            Some(Ok(state)) => {
                self.state = state;
                true
            }
            _ => false,
        }
    }
}

/// `<Get Menu Language>` / `<Set Menu Language>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuLanguage {
    /// ISO 639-2 code, e.g. `b"eng"`.
    pub language: [u8; 3],
}

impl MenuLanguage {
    pub fn new(language: [u8; 3]) -> Self {
        Self { language }
    }
}

impl Message for MenuLanguage {
    const REQUEST: Opcode = Opcode::GetMenuLanguage;
    const RESPONSE: Opcode = Opcode::SetMenuLanguage;

    fn process(&self, buffer: &mut [u8], _length: usize) -> usize {
        buffer[..3].copy_from_slice(&self.language);
        3
    }

    fn accept(&mut self, operands: &[u8]) -> bool {
        match operands {
            [a, b, c, ..] => {
                self.language = [*a, *b, *c];
                true
            }
            _ => false,
        }
    }
}

/// `<Standby>`; never answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Standby;

impl Message for Standby {
    const REQUEST: Opcode = Opcode::Standby;
    const RESPONSE: Opcode = Opcode::NoOpcode;
}

/// `<Abort>` test message; always refused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbortProbe;

impl Message for AbortProbe {
    const REQUEST: Opcode = Opcode::Abort;
    const RESPONSE: Opcode = Opcode::FeatureAbort;

    fn process(&self, buffer: &mut [u8], _length: usize) -> usize {
        buffer[0] = Opcode::Abort.raw();
        buffer[1] = AbortReason::Refused.raw();
        2
    }
}

/// Announce the standard services for `config`, in a fixed order.
///
/// The returned guards keep the services registered.
pub fn register_defaults(processor: &Arc<Processor>, config: &DeviceConfig) -> Vec<ServiceGuard> {
    let mut guards = vec![
        processor.register(
            ServiceType::new(PhysicalAddress::new(config.physical_address, config.role))
                .broadcast(true),
        ),
        processor.register(ServiceType::new(VendorId::new(config.vendor_id)).broadcast(true)),
        processor.register(ServiceType::new(OsdName::new(config.osd_name.clone()))),
        processor.register(ServiceType::new(Version::new(config.cec_version))),
        processor.register(ServiceType::new(PowerStatus::new(config.power_status))),
        processor.register(ServiceType::new(AbortProbe)),
        processor.register(ServiceType::new(Standby)),
    ];

    if let Some(language) = config.menu_language_code() {
        guards.push(
            processor.register(
                ServiceType::new(MenuLanguage::new(language))
                    .broadcast(true)
                    .roles(RoleMask::TV),
            ),
        );
    }

    tracing::debug!("Registered {} default services", guards.len());
    guards
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Service;
    use crate::protocol::{OperationFrame, FEATURE_ABORT, MAX_LENGTH};

    #[test]
    fn test_vendor_id_process_and_accept() {
        let service = ServiceType::new(VendorId::new(0x000D36));
        let mut buffer = [0u8; MAX_LENGTH];
        assert_eq!(service.handle(&mut buffer, 0), Ok(3));
        assert_eq!(&buffer[..3], &[0x00, 0x0D, 0x36]);

        let mut parsed = VendorId::default();
        assert!(parsed.accept(&buffer[..3]));
        assert_eq!(parsed.id, 0x000D36);
        assert!(!parsed.accept(&[0x00]));
    }

    #[test]
    fn test_vendor_id_masks_to_24_bits() {
        assert_eq!(VendorId::new(0xFF12_3456).id, 0x12_3456);
    }

    #[test]
    fn test_osd_name_truncated() {
        let service = ServiceType::new(OsdName::new("A very long device name"));
        let mut buffer = [0u8; MAX_LENGTH];

        // Limited by the frame buffer before the 14 byte OSD limit
        assert_eq!(service.handle(&mut buffer, 0), Ok(MAX_LENGTH));
        assert_eq!(&buffer[..], b"A very long d");
    }

    #[test]
    fn test_osd_name_accept() {
        let mut name = OsdName::default();
        assert!(name.accept(b"Metrological"));
        assert_eq!(name.name(), "Metrological");
        assert!(!name.accept(b""));
    }

    #[test]
    fn test_physical_address() {
        let message = PhysicalAddress::new(0x1000, AdapterRole::Playback);
        let mut buffer = [0u8; MAX_LENGTH];
        assert_eq!(message.process(&mut buffer, 0), 3);
        assert_eq!(&buffer[..3], &[0x10, 0x00, 0x04]);

        let mut parsed = PhysicalAddress::default();
        assert!(parsed.accept(&buffer[..3]));
        assert_eq!(parsed, message);
    }

    #[test]
    fn test_power_status_rejects_unknown_state() {
        let mut status = PowerStatus::default();
        assert!(status.accept(&[0x01]));
        assert_eq!(status.state, PowerState::Standby);
        assert!(!status.accept(&[0x09]));
        assert!(!status.accept(&[]));
    }

    #[test]
    fn test_abort_probe_refused() {
        let processor = Processor::new();
        processor.announce(Arc::new(ServiceType::new(AbortProbe)));

        let mut frame = OperationFrame::new(Opcode::Abort.raw());
        processor.process(&mut frame);

        assert_eq!(frame.opcode(), FEATURE_ABORT);
        assert_eq!(frame.parameters(), &[0xFF, 0x04]);
        assert_eq!(frame.abort_reason(), Some(AbortReason::Refused));
    }

    #[test]
    fn test_standby_has_no_answer() {
        let service = ServiceType::new(Standby);
        assert_eq!(service.response_opcode(), crate::protocol::NO_OPCODE);
    }

    #[test]
    fn test_register_defaults() {
        let processor = Arc::new(Processor::new());
        let config = DeviceConfig {
            menu_language: Some("eng".to_string()),
            ..DeviceConfig::default()
        };

        let guards = register_defaults(&processor, &config);
        assert_eq!(guards.len(), 8);
        assert!(guards.iter().all(ServiceGuard::is_announced));
        assert!(processor.is_announced(Opcode::Standby.raw()));
        assert!(processor.is_announced(Opcode::GiveOsdName.raw()));
        assert!(processor.is_announced(Opcode::GetMenuLanguage.raw()));

        drop(guards);
        assert!(processor.is_empty());
    }

    #[test]
    fn test_register_defaults_without_language() {
        let processor = Arc::new(Processor::new());
        let guards = register_defaults(&processor, &DeviceConfig::default());

        assert_eq!(guards.len(), 7);
        assert!(processor.is_announced(Opcode::Standby.raw()));
        assert!(!processor.is_announced(Opcode::GetMenuLanguage.raw()));
    }

    #[test]
    fn test_standby_answered_with_no_opcode() {
        let processor = Arc::new(Processor::new());
        let _guards = register_defaults(&processor, &DeviceConfig::default());

        let mut frame = OperationFrame::new(Opcode::Standby.raw());
        let disposition = processor.process(&mut frame);

        assert_eq!(frame.opcode(), crate::protocol::NO_OPCODE);
        assert!(frame.is_empty());
        assert_eq!(disposition.abort, None);
    }

    #[test]
    fn test_vendor_id_scenario() {
        let processor = Arc::new(Processor::new());
        let _guards = register_defaults(&processor, &DeviceConfig::default());

        let mut frame = OperationFrame::new(0x8C);
        let disposition = processor.process(&mut frame);

        assert_eq!(frame.opcode(), 0x87);
        assert_eq!(frame.len(), 3);
        assert!(disposition.broadcast);
    }
}
