//! Service definitions for request dispatch.
//!
//! A [`Service`] describes one supported request opcode: which opcode
//! answers it, whether the answer is broadcast, which roles may answer, and
//! how to validate and fill the payload.
//!
//! Concrete messages implement [`Message`] and are wrapped in
//! [`ServiceType`] to become a service. Hooks a message does not override
//! accept any payload and answer with zero parameter bytes.
//!
//! # Example
//!
//! ```
//! use cec_control::handler::{Message, Service, ServiceType};
//! use cec_control::protocol::Opcode;
//!
//! struct PowerOn;
//!
//! impl Message for PowerOn {
//!     const REQUEST: Opcode = Opcode::GiveDevicePowerStatus;
//!     const RESPONSE: Opcode = Opcode::ReportPowerStatus;
//!
//!     fn process(&self, buffer: &mut [u8], _length: usize) -> usize {
//!         buffer[0] = 0x00;
//!         1
//!     }
//! }
//!
//! let service = ServiceType::new(PowerOn);
//! let mut buffer = [0u8; 13];
//! assert_eq!(service.handle(&mut buffer, 0), Ok(1));
//! ```

use thiserror::Error;

use crate::protocol::{AdapterRole, Opcode, RoleMask};

/// Request payload failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid operand")]
pub struct InvalidPayload;

/// Trait for registered request handlers.
pub trait Service: Send + Sync + 'static {
    /// Opcode this service answers.
    fn request_opcode(&self) -> u8;

    /// Opcode written into the answer.
    fn response_opcode(&self) -> u8;

    /// Whether the answer is sent to every device.
    fn is_broadcast(&self) -> bool;

    /// Roles that may answer this request.
    fn allowed_roles(&self) -> RoleMask;

    /// Whether a device acting as `role` may answer.
    fn is_allowed(&self, role: AdapterRole) -> bool {
        self.allowed_roles().intersects(role.mask())
    }

    /// Validate the `length` request bytes in `buffer` and overwrite them
    /// with the answer, returning the answer length.
    ///
    /// `buffer.len()` is the maximum answer length.
    fn handle(&self, buffer: &mut [u8], length: usize) -> Result<usize, InvalidPayload>;
}

/// A request/response message pair.
///
/// Responder hooks (`is_valid`, `process`) are used by [`ServiceType`];
/// initiator hooks (`operands`, `accept`) by
/// [`ExchangeType`](crate::exchange::ExchangeType).
pub trait Message: Send + Sync + 'static {
    /// Opcode of the request.
    const REQUEST: Opcode;
    /// Opcode of the answer, `Opcode::NoOpcode` when none is sent.
    const RESPONSE: Opcode;

    /// Check the request operands.
    fn is_valid(&self, _operands: &[u8]) -> bool {
        true
    }

    /// Write the answer operands over the request operands.
    fn process(&self, _buffer: &mut [u8], _length: usize) -> usize {
        0
    }

    /// Write the request operands.
    fn operands(&self, _buffer: &mut [u8]) -> usize {
        0
    }

    /// Take the answer operands. Returns false if they cannot be parsed.
    fn accept(&mut self, _operands: &[u8]) -> bool {
        true
    }
}

/// Service backed by a [`Message`].
pub struct ServiceType<M: Message> {
    message: M,
    broadcast: bool,
    roles: RoleMask,
}

impl<M: Message> ServiceType<M> {
    /// Direct answer, any role may answer.
    pub fn new(message: M) -> Self {
        Self {
            message,
            broadcast: false,
            roles: RoleMask::all(),
        }
    }

    /// Set whether the answer is broadcast.
    pub fn broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// Restrict the roles that may answer.
    pub fn roles(mut self, roles: RoleMask) -> Self {
        self.roles = roles;
        self
    }

    /// The wrapped message.
    pub fn message(&self) -> &M {
        &self.message
    }
}

impl<M: Message> Service for ServiceType<M> {
    fn request_opcode(&self) -> u8 {
        M::REQUEST.raw()
    }

    fn response_opcode(&self) -> u8 {
        M::RESPONSE.raw()
    }

    fn is_broadcast(&self) -> bool {
        self.broadcast
    }

    fn allowed_roles(&self) -> RoleMask {
        self.roles
    }

    fn handle(&self, buffer: &mut [u8], length: usize) -> Result<usize, InvalidPayload> {
        let length = length.min(buffer.len());
        if !self.message.is_valid(&buffer[..length]) {
            return Err(InvalidPayload);
        }
        Ok(self.message.process(buffer, length).min(buffer.len()))
    }
}
