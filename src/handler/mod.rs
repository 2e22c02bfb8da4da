//! Handler module - services and request dispatch.
//!
//! Provides:
//! - [`Service`] / [`ServiceType`] - one supported request opcode
//! - [`Processor`] - maps request opcodes to services and answers frames
//! - [`messages`] - standard messages and the default service table
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cec_control::handler::{messages::VendorId, Processor, ServiceType};
//! use cec_control::protocol::OperationFrame;
//!
//! let processor = Arc::new(Processor::new());
//! let _guard = processor.register(ServiceType::new(VendorId::new(0x000D36)).broadcast(true));
//!
//! let mut frame = OperationFrame::new(0x8C);
//! assert!(processor.process(&mut frame).broadcast);
//! assert_eq!(frame.opcode(), 0x87);
//! ```

pub mod messages;
mod registry;
mod service;

pub use registry::{Disposition, Processor, ServiceGuard};
pub use service::{InvalidPayload, Message, Service, ServiceType};
