//! # cec-control
//!
//! HDMI-CEC message processing and exchange runtime.
//!
//! The crate answers incoming CEC requests on behalf of a local device and
//! lets local code run request/answer exchanges with other devices on the
//! bus.
//!
//! ## Architecture
//!
//! - **Processor**: opcode-keyed service table; rewrites a request frame
//!   into its answer or a `<Feature Abort>`
//! - **Adapter**: serializes exchanges, matches answers, and routes every
//!   other frame through the processor to the reply queue
//! - **Transport**: the [`DeviceAdapter`](transport::DeviceAdapter) seam to a
//!   bus driver, with an in-memory bus for tests
//!
//! ## Example
//!
//! ```
//! use cec_control::handler::messages::register_defaults;
//! use cec_control::control::DeviceConfig;
//! use cec_control::protocol::{OperationFrame, Opcode};
//! use cec_control::Processor;
//! use std::sync::Arc;
//!
//! let processor = Arc::new(Processor::new());
//! let _services = register_defaults(&processor, &DeviceConfig::default());
//!
//! let mut frame = OperationFrame::new(Opcode::GiveOsdName.raw());
//! processor.process(&mut frame);
//!
//! assert_eq!(frame.opcode(), Opcode::SetOsdName.raw());
//! assert_eq!(frame.parameters(), b"Metrological");
//! ```

pub mod control;
pub mod error;
pub mod exchange;
pub mod handler;
pub mod protocol;
pub mod transport;
pub mod writer;

mod adapter;

pub use adapter::{Adapter, AdapterBuilder, Reply, DEFAULT_WAIT_TIME};
pub use error::{CecError, Result};
pub use exchange::{Exchange, ExchangeType};
pub use handler::{Processor, Service, ServiceGuard, ServiceType};
