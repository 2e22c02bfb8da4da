//! Operation frame: one opcode plus bounded parameter bytes.
//!
//! The frame owns a fixed parameter buffer so a request can be rewritten
//! into its response in place: borrow the buffer with
//! [`OperationFrame::buffer_mut`], write the answer, then commit it with
//! [`OperationFrame::convert_in_place`].
//!
//! # Example
//!
//! ```
//! use cec_control::protocol::{OperationFrame, Opcode};
//!
//! let mut frame = OperationFrame::new(Opcode::GiveOsdName.raw());
//! frame.buffer_mut()[..2].copy_from_slice(b"TV");
//! frame.convert_in_place(Opcode::SetOsdName.raw(), 2);
//!
//! assert_eq!(frame.opcode(), 0x47);
//! assert_eq!(frame.parameters(), b"TV");
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::opcode::{AbortReason, Opcode, FEATURE_ABORT};
use crate::error::{CecError, Result};

/// Maximum number of parameter bytes after the opcode.
pub const MAX_LENGTH: usize = 13;

/// A mutable CEC operation frame.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct OperationFrame {
    opcode: u8,
    length: usize,
    parameters: [u8; MAX_LENGTH],
}

impl OperationFrame {
    /// Create a frame with no parameters.
    pub fn new(opcode: u8) -> Self {
        Self {
            opcode,
            length: 0,
            parameters: [0; MAX_LENGTH],
        }
    }

    /// Create a frame with the given parameters.
    pub fn with_parameters(opcode: u8, parameters: &[u8]) -> Result<Self> {
        if parameters.len() > MAX_LENGTH {
            return Err(CecError::FrameTooLong(parameters.len() + 1));
        }
        let mut frame = Self::new(opcode);
        frame.parameters[..parameters.len()].copy_from_slice(parameters);
        frame.length = parameters.len();
        Ok(frame)
    }

    /// Decode `opcode ++ parameters` as received from the bus.
    pub fn decode(data: &[u8]) -> Result<Self> {
        match data.split_first() {
            Some((&opcode, parameters)) => Self::with_parameters(opcode, parameters),
            None => Err(CecError::Protocol("Frame has no opcode".to_string())),
        }
    }

    /// Encode as `opcode ++ parameters`.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + self.length);
        buf.put_u8(self.opcode);
        buf.put_slice(self.parameters());
        buf.freeze()
    }

    #[inline]
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Parameter bytes currently in use.
    #[inline]
    pub fn parameters(&self) -> &[u8] {
        &self.parameters[..self.length]
    }

    /// Number of parameter bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whole parameter buffer, including the unused tail.
    ///
    /// The logical length is left untouched until [`Self::convert_in_place`].
    #[inline]
    pub fn buffer_mut(&mut self) -> &mut [u8; MAX_LENGTH] {
        &mut self.parameters
    }

    /// Commit a new opcode and parameter length after writing the buffer.
    ///
    /// Lengths beyond [`MAX_LENGTH`] are clamped.
    pub fn convert_in_place(&mut self, opcode: u8, length: usize) {
        self.opcode = opcode;
        self.length = length.min(MAX_LENGTH);
    }

    /// Turn this frame into `<Feature Abort>` carrying `reason`.
    pub fn abort(&mut self, reason: AbortReason) {
        self.parameters[0] = reason.raw();
        self.convert_in_place(FEATURE_ABORT, 1);
    }

    #[inline]
    pub fn is_feature_abort(&self) -> bool {
        self.opcode == FEATURE_ABORT
    }

    /// Reason of a `<Feature Abort>` frame.
    ///
    /// Accepts both the one-byte form and the `[opcode, reason]` form.
    pub fn abort_reason(&self) -> Option<AbortReason> {
        if !self.is_feature_abort() {
            return None;
        }
        self.parameters()
            .last()
            .and_then(|&raw| AbortReason::try_from(raw).ok())
    }
}

impl Default for OperationFrame {
    fn default() -> Self {
        Self::new(Opcode::NoOpcode.raw())
    }
}

impl std::fmt::Debug for OperationFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationFrame")
            .field("opcode", &format_args!("{:#04x} ({})", self.opcode, Opcode::name_of(self.opcode)))
            .field("parameters", &self.parameters())
            .finish()
    }
}
