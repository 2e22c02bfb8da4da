//! Protocol module - addresses, opcodes, framing.
//!
//! This module implements the CEC data model:
//! - Logical addresses and device roles with their conversion tables
//! - Opcode and abort reason enumerations
//! - Operation frames that are rewritten in place
//! - Header block encoding for bus frames

mod address;
mod frame;
mod opcode;
mod wire_format;

pub use address::{AdapterRole, LogicalAddress, RoleMask, COLLAPSED_ADDRESSES};
pub use frame::{OperationFrame, MAX_LENGTH};
pub use opcode::{AbortReason, Opcode, FEATURE_ABORT, NO_OPCODE};
pub use wire_format::{build_frame, build_poll, parse_frame, Header, HEADER_SIZE, MAX_FRAME_SIZE};
