//! Exchanges: locally initiated request/answer pairs.
//!
//! An [`Exchange`] writes the request frame and parses the answer frame.
//! [`ExchangeType`] implements it for any [`Message`].
//!
//! # Example
//!
//! ```
//! use cec_control::exchange::{Exchange, ExchangeType};
//! use cec_control::handler::messages::OsdName;
//! use cec_control::protocol::{OperationFrame, Opcode};
//!
//! let mut exchange = ExchangeType::new(OsdName::default());
//!
//! let mut request = OperationFrame::default();
//! exchange.serialize(&mut request);
//! assert_eq!(request.opcode(), Opcode::GiveOsdName.raw());
//!
//! let answer = OperationFrame::with_parameters(Opcode::SetOsdName.raw(), b"TV").unwrap();
//! assert!(exchange.deserialize(&answer));
//! assert_eq!(exchange.message().name(), "TV");
//! ```

use crate::handler::Message;
use crate::protocol::{OperationFrame, FEATURE_ABORT, NO_OPCODE};

/// One request/answer interaction started by local code.
pub trait Exchange: Send {
    /// Opcode of the request.
    fn request_opcode(&self) -> u8;

    /// Opcode of the expected answer, [`NO_OPCODE`] when none is expected.
    fn response_opcode(&self) -> u8;

    /// Write the request into `frame`.
    fn serialize(&self, frame: &mut OperationFrame);

    /// Take the answer. Returns false if `frame` is not a valid answer.
    fn deserialize(&mut self, frame: &OperationFrame) -> bool;

    /// Whether to wait for an answer at all.
    fn answer_expected(&self) -> bool {
        self.response_opcode() != NO_OPCODE
    }
}

/// Exchange backed by a [`Message`].
#[derive(Debug, Clone, Default)]
pub struct ExchangeType<M: Message> {
    message: M,
}

impl<M: Message> ExchangeType<M> {
    pub fn new(message: M) -> Self {
        Self { message }
    }

    /// The message, holding the parsed answer after a successful exchange.
    pub fn message(&self) -> &M {
        &self.message
    }

    pub fn into_inner(self) -> M {
        self.message
    }
}

impl<M: Message> Exchange for ExchangeType<M> {
    fn request_opcode(&self) -> u8 {
        M::REQUEST.raw()
    }

    fn response_opcode(&self) -> u8 {
        M::RESPONSE.raw()
    }

    fn serialize(&self, frame: &mut OperationFrame) {
        let length = self.message.operands(frame.buffer_mut());
        frame.convert_in_place(M::REQUEST.raw(), length);
    }

    fn deserialize(&mut self, frame: &OperationFrame) -> bool {
        frame.opcode() == M::RESPONSE.raw() && self.message.accept(frame.parameters())
    }
}

/// What a pending exchange waits for.
///
/// Checked on the receive path, so it holds plain values only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Expectation {
    pub request: u8,
    pub response: u8,
}

impl Expectation {
    pub fn of(exchange: &dyn Exchange) -> Self {
        Self {
            request: exchange.request_opcode(),
            response: exchange.response_opcode(),
        }
    }

    /// Whether `frame` answers the request, including a refusal of it.
    pub fn matches(&self, frame: &OperationFrame) -> bool {
        if frame.opcode() == self.response {
            return true;
        }
        if frame.opcode() != FEATURE_ABORT {
            return false;
        }
        match frame.parameters() {
            // Short form carries only the reason
            [_reason] => true,
            [opcode, _reason, ..] => *opcode == self.request,
            [] => false,
        }
    }
}
