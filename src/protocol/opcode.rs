//! Opcodes and abort reasons.
//!
//! Frames carry the opcode as a raw `u8` so that unknown values survive
//! decoding; [`Opcode`] names the known ones.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Opcode of `<Feature Abort>`.
pub const FEATURE_ABORT: u8 = 0x00;

/// Sentinel: no payload on request / no answer expected.
pub const NO_OPCODE: u8 = 0xFD;

/// Known CEC opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Opcode {
    FeatureAbort = 0x00,
    ImageViewOn = 0x04,
    TunerStepIncrement = 0x05,
    TunerStepDecrement = 0x06,
    TunerDeviceStatus = 0x07,
    GiveTunerDeviceStatus = 0x08,
    RecordOn = 0x09,
    RecordStatus = 0x0A,
    RecordOff = 0x0B,
    TextViewOn = 0x0D,
    RecordTvScreen = 0x0F,
    GiveDeckStatus = 0x1A,
    DeckStatus = 0x1B,
    SetMenuLanguage = 0x32,
    ClearAnalogueTimer = 0x33,
    SetAnalogueTimer = 0x34,
    TimerStatus = 0x35,
    Standby = 0x36,
    Play = 0x41,
    DeckControl = 0x42,
    TimerClearedStatus = 0x43,
    UserControlPressed = 0x44,
    UserControlReleased = 0x45,
    GiveOsdName = 0x46,
    SetOsdName = 0x47,
    SetOsdString = 0x64,
    SetTimerProgramTitle = 0x67,
    SystemAudioModeRequest = 0x70,
    GiveAudioStatus = 0x71,
    SetSystemAudioMode = 0x72,
    ReportAudioStatus = 0x7A,
    GiveSystemAudioModeStatus = 0x7D,
    SystemAudioModeStatus = 0x7E,
    RoutingChange = 0x80,
    RoutingInformation = 0x81,
    ActiveSource = 0x82,
    GivePhysicalAddr = 0x83,
    ReportPhysicalAddr = 0x84,
    RequestActiveSource = 0x85,
    SetStreamPath = 0x86,
    DeviceVendorId = 0x87,
    VendorCommand = 0x89,
    VendorRemoteButtonDown = 0x8A,
    VendorRemoteButtonUp = 0x8B,
    GiveDeviceVendorId = 0x8C,
    MenuRequest = 0x8D,
    MenuStatus = 0x8E,
    GiveDevicePowerStatus = 0x8F,
    ReportPowerStatus = 0x90,
    GetMenuLanguage = 0x91,
    SelectAnalogueService = 0x92,
    SelectDigitalService = 0x93,
    SetDigitalTimer = 0x97,
    ClearDigitalTimer = 0x99,
    SetAudioRate = 0x9A,
    InactiveSource = 0x9D,
    CecVersion = 0x9E,
    GetCecVersion = 0x9F,
    VendorCommandWithId = 0xA0,
    ClearExternalTimer = 0xA1,
    SetExternalTimer = 0xA2,
    ReportShortAudioDescriptor = 0xA3,
    RequestShortAudioDescriptor = 0xA4,
    GiveFeatures = 0xA5,
    ReportFeatures = 0xA6,
    RequestCurrentLatency = 0xA7,
    ReportCurrentLatency = 0xA8,
    InitiateArc = 0xC0,
    ReportArcInitiated = 0xC1,
    ReportArcTerminated = 0xC2,
    RequestArcInitiation = 0xC3,
    RequestArcTermination = 0xC4,
    TerminateArc = 0xC5,
    CdcMessage = 0xF8,
    NoOpcode = 0xFD,
    Abort = 0xFF,
}

impl Opcode {
    /// Raw byte value.
    #[inline]
    pub fn raw(self) -> u8 {
        self.into()
    }

    /// Debug name for a raw opcode, `"Unknown"` when not named.
    pub fn name_of(raw: u8) -> String {
        match Self::try_from(raw) {
            Ok(opcode) => format!("{opcode:?}"),
            Err(_) => "Unknown".to_string(),
        }
    }
}

/// Reason carried by `<Feature Abort>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum AbortReason {
    UnrecognizedOpcode = 0,
    NotInCorrectMode = 1,
    CannotProvideSource = 2,
    InvalidOperand = 3,
    Refused = 4,
}

impl AbortReason {
    /// Raw byte value.
    #[inline]
    pub fn raw(self) -> u8 {
        self.into()
    }
}
