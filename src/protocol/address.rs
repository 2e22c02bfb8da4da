//! Logical addresses and adapter roles.
//!
//! A logical address is the 4-bit bus identity of a device. A role is the
//! coarse device type behind it. Both conversions are total:
//!
//! - address to role is many-to-one; unmapped addresses yield [`AdapterRole::Unknown`]
//! - role to addresses is one-to-many; unmapped roles yield an empty list
//!
//! The two tables are consistent except for the collapsing entries listed in
//! [`COLLAPSED_ADDRESSES`].

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::error::{CecError, Result};

/// Logical address of a bus participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum LogicalAddress {
    Tv = 0x0,
    Record1 = 0x1,
    Record2 = 0x2,
    Tuner1 = 0x3,
    Playback1 = 0x4,
    AudioSystem = 0x5,
    Tuner2 = 0x6,
    Tuner3 = 0x7,
    Playback2 = 0x8,
    Record3 = 0x9,
    Tuner4 = 0xA,
    Playback3 = 0xB,
    Backup1 = 0xC,
    Backup2 = 0xD,
    Specific = 0xE,
    /// Broadcast as destination, unregistered as initiator.
    Broadcast = 0xF,
    /// Not claimed / unset.
    Invalid = 0xFF,
}

impl LogicalAddress {
    /// Every address that can appear in a header nibble.
    pub const ALL: [LogicalAddress; 16] = [
        Self::Tv,
        Self::Record1,
        Self::Record2,
        Self::Tuner1,
        Self::Playback1,
        Self::AudioSystem,
        Self::Tuner2,
        Self::Tuner3,
        Self::Playback2,
        Self::Record3,
        Self::Tuner4,
        Self::Playback3,
        Self::Backup1,
        Self::Backup2,
        Self::Specific,
        Self::Broadcast,
    ];

    /// Address from the low 4 bits of `nibble`.
    #[inline]
    pub fn from_nibble(nibble: u8) -> Self {
        Self::ALL[(nibble & 0x0F) as usize]
    }

    /// Parse a raw byte, rejecting anything that is not a bus address.
    pub fn from_raw(raw: u8) -> Result<Self> {
        match Self::try_from(raw) {
            Ok(Self::Invalid) | Err(_) => Err(CecError::InvalidAddress(raw)),
            Ok(address) => Ok(address),
        }
    }

    /// Raw byte value.
    #[inline]
    pub fn raw(self) -> u8 {
        self.into()
    }

    #[inline]
    pub fn is_broadcast(self) -> bool {
        self == Self::Broadcast
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::Invalid
    }

    /// Role of the device that claims this address.
    pub fn role(self) -> AdapterRole {
        match self {
            Self::Tv => AdapterRole::Tv,
            Self::Record1 | Self::Record2 | Self::Record3 => AdapterRole::Recorder,
            Self::Tuner1 | Self::Tuner2 | Self::Tuner3 | Self::Tuner4 => AdapterRole::Tuner,
            Self::Playback1 | Self::Playback2 | Self::Playback3 => AdapterRole::Playback,
            Self::AudioSystem => AdapterRole::AudioSystem,
            Self::Backup1 | Self::Backup2 | Self::Specific => AdapterRole::VideoProcessor,
            Self::Broadcast | Self::Invalid => AdapterRole::Unknown,
        }
    }
}

/// Addresses that map to a role without appearing in that role's address list.
pub const COLLAPSED_ADDRESSES: [LogicalAddress; 2] =
    [LogicalAddress::Backup1, LogicalAddress::Backup2];

/// Coarse capability class of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterRole {
    Tv,
    Recorder,
    Tuner,
    Playback,
    #[serde(rename = "audiosystem")]
    AudioSystem,
    Switch,
    #[serde(rename = "videoprocessor")]
    VideoProcessor,
    All,
    Unknown,
}

bitflags! {
    /// Set of roles, one disjoint bit per concrete role.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RoleMask: u8 {
        const TV              = 1 << 0;
        const RECORDER        = 1 << 1;
        const TUNER           = 1 << 2;
        const PLAYBACK        = 1 << 3;
        const AUDIO_SYSTEM    = 1 << 4;
        const SWITCH          = 1 << 5;
        const VIDEO_PROCESSOR = 1 << 6;
    }
}

impl AdapterRole {
    /// Bit(s) of this role in a [`RoleMask`].
    pub fn mask(self) -> RoleMask {
        match self {
            Self::Tv => RoleMask::TV,
            Self::Recorder => RoleMask::RECORDER,
            Self::Tuner => RoleMask::TUNER,
            Self::Playback => RoleMask::PLAYBACK,
            Self::AudioSystem => RoleMask::AUDIO_SYSTEM,
            Self::Switch => RoleMask::SWITCH,
            Self::VideoProcessor => RoleMask::VIDEO_PROCESSOR,
            Self::All => RoleMask::all(),
            Self::Unknown => RoleMask::empty(),
        }
    }

    /// Logical addresses a device of this role may claim, in claim order.
    pub fn addresses(self) -> Vec<LogicalAddress> {
        use LogicalAddress as A;

        match self {
            Self::Tv => vec![A::Tv],
            Self::Recorder => vec![A::Record1, A::Record2, A::Record3],
            Self::Tuner => vec![A::Tuner1, A::Tuner2, A::Tuner3, A::Tuner4],
            Self::Playback => vec![A::Playback1, A::Playback2, A::Playback3],
            Self::AudioSystem => vec![A::AudioSystem],
            // Switches have no address of their own and talk as unregistered.
            Self::Switch => vec![A::Broadcast],
            Self::VideoProcessor => vec![A::Specific],
            Self::All => A::ALL[..15].to_vec(),
            Self::Unknown => Vec::new(),
        }
    }
}

impl From<LogicalAddress> for AdapterRole {
    fn from(address: LogicalAddress) -> Self {
        address.role()
    }
}
