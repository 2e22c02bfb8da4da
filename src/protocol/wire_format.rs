//! Wire format encoding and decoding.
//!
//! A CEC frame on the bus is a header block followed by an optional
//! operation frame:
//! ```text
//! ┌───────────┬─────────────┬────────┬──────────────────┐
//! │ Initiator │ Destination │ Opcode │ Parameters       │
//! │ 4 bits    │ 4 bits      │ 1 byte │ 0..13 bytes      │
//! └───────────┴─────────────┴────────┴──────────────────┘
//! ```
//!
//! A header block with nothing after it is a polling message.

use super::address::LogicalAddress;
use super::frame::{OperationFrame, MAX_LENGTH};
use crate::error::{CecError, Result};

/// Header block size in bytes.
pub const HEADER_SIZE: usize = 1;

/// Largest frame this crate puts on the wire.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + 1 + MAX_LENGTH;

/// Decoded header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Sender of the frame.
    pub initiator: LogicalAddress,
    /// Receiver of the frame, `Broadcast` for everyone.
    pub destination: LogicalAddress,
}

impl Header {
    /// Create a new header.
    pub fn new(initiator: LogicalAddress, destination: LogicalAddress) -> Self {
        Self {
            initiator,
            destination,
        }
    }

    /// Encode the header block.
    ///
    /// # Example
    ///
    /// ```
    /// use cec_control::protocol::{Header, LogicalAddress};
    ///
    /// let header = Header::new(LogicalAddress::Playback1, LogicalAddress::Tv);
    /// assert_eq!(header.encode(), 0x40);
    /// ```
    pub fn encode(&self) -> u8 {
        ((self.initiator.raw() & 0x0F) << 4) | (self.destination.raw() & 0x0F)
    }

    /// Decode a header block. Every byte is a valid header.
    pub fn decode(byte: u8) -> Self {
        Self {
            initiator: LogicalAddress::from_nibble(byte >> 4),
            destination: LogicalAddress::from_nibble(byte),
        }
    }

    #[inline]
    pub fn is_broadcast(&self) -> bool {
        self.destination.is_broadcast()
    }
}

/// Build a complete bus frame.
pub fn build_frame(header: &Header, frame: &OperationFrame) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + 1 + frame.len());
    buf.push(header.encode());
    buf.push(frame.opcode());
    buf.extend_from_slice(frame.parameters());
    buf
}

/// Build a polling message (header block only).
pub fn build_poll(header: &Header) -> Vec<u8> {
    vec![header.encode()]
}

/// Parse a complete bus frame.
///
/// Returns `None` for the operation frame of a polling message.
pub fn parse_frame(data: &[u8]) -> Result<(Header, Option<OperationFrame>)> {
    let Some((&header, rest)) = data.split_first() else {
        return Err(CecError::Protocol("Empty bus frame".to_string()));
    };
    if data.len() > MAX_FRAME_SIZE {
        return Err(CecError::FrameTooLong(data.len()));
    }

    let header = Header::decode(header);
    if rest.is_empty() {
        return Ok((header, None));
    }
    Ok((header, Some(OperationFrame::decode(rest)?)))
}
