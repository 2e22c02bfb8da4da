//! Processor: the opcode to service dispatch table.
//!
//! The processor turns one received frame into one answer frame, in place.
//! Every frame gets an answer: either the service's response or a
//! `<Feature Abort>` with the matching reason.
//!
//! Registration and dispatch share one lock, so no dispatch ever sees a
//! half-updated table.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cec_control::handler::{messages::OsdName, Processor, ServiceType};
//! use cec_control::protocol::{OperationFrame, Opcode};
//!
//! let processor = Arc::new(Processor::new());
//! let _guard = processor.register(ServiceType::new(OsdName::new("Metrological")));
//!
//! let mut frame = OperationFrame::new(Opcode::GiveOsdName.raw());
//! let disposition = processor.process(&mut frame);
//!
//! assert_eq!(frame.opcode(), Opcode::SetOsdName.raw());
//! assert_eq!(frame.parameters(), b"Metrological");
//! assert!(!disposition.broadcast);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::service::Service;
use crate::protocol::{AbortReason, AdapterRole, Opcode, OperationFrame};

/// How a processed frame should be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disposition {
    /// Send to every device instead of the initiator.
    pub broadcast: bool,
    /// Set when the frame was turned into `<Feature Abort>`.
    pub abort: Option<AbortReason>,
}

impl Disposition {
    fn answered(broadcast: bool) -> Self {
        Self {
            broadcast,
            abort: None,
        }
    }

    fn aborted(reason: AbortReason) -> Self {
        Self {
            broadcast: false,
            abort: Some(reason),
        }
    }
}

/// Dispatch table mapping request opcodes to services.
pub struct Processor {
    services: Mutex<HashMap<u8, Arc<dyn Service>>>,
}

impl Processor {
    /// Create an empty processor.
    pub fn new() -> Self {
        Self {
            services: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u8, Arc<dyn Service>>> {
        self.services.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a service to the table.
    ///
    /// A second service for an opcode that is already taken is refused and
    /// stays unreachable. Returns whether the service was inserted.
    pub fn announce(&self, service: Arc<dyn Service>) -> bool {
        let opcode = service.request_opcode();
        let mut services = self.lock();

        if services.contains_key(&opcode) {
            tracing::warn!(
                "Service for opcode {:#04x} ({}) already announced, ignoring duplicate",
                opcode,
                Opcode::name_of(opcode)
            );
            return false;
        }

        services.insert(opcode, service);
        true
    }

    /// Remove a service from the table.
    ///
    /// Only removes the entry if it is this exact service. Returns whether
    /// anything was removed.
    pub fn revoke(&self, service: &Arc<dyn Service>) -> bool {
        let opcode = service.request_opcode();
        let mut services = self.lock();

        match services.get(&opcode) {
            Some(current) if same_service(current, service) => {
                services.remove(&opcode);
                true
            }
            _ => {
                tracing::warn!(
                    "Service for opcode {:#04x} ({}) is not announced, nothing to revoke",
                    opcode,
                    Opcode::name_of(opcode)
                );
                false
            }
        }
    }

    /// Announce a service and revoke it when the guard drops.
    pub fn register<S: Service>(self: &Arc<Self>, service: S) -> ServiceGuard {
        let service: Arc<dyn Service> = Arc::new(service);
        let announced = self.announce(service.clone());

        ServiceGuard {
            processor: Arc::downgrade(self),
            service,
            announced,
        }
    }

    /// Check whether a request opcode is dispatchable.
    pub fn is_announced(&self, opcode: u8) -> bool {
        self.lock().contains_key(&opcode)
    }

    /// Number of announced services.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Rewrite `frame` into its answer, ignoring role restrictions.
    pub fn process(&self, frame: &mut OperationFrame) -> Disposition {
        self.process_for(AdapterRole::All, frame)
    }

    /// Rewrite `frame` into the answer a device acting as `role` gives.
    ///
    /// A service that does not allow `role` is treated as absent.
    pub fn process_for(&self, role: AdapterRole, frame: &mut OperationFrame) -> Disposition {
        let request = frame.opcode();
        let services = self.lock();

        let service = match services.get(&request) {
            Some(service) if service.is_allowed(role) => Some(service),
            Some(_) => {
                tracing::debug!(
                    "Opcode {:#04x} not answered by role {:?}",
                    request,
                    role
                );
                None
            }
            None => None,
        };

        let disposition = match service {
            Some(service) => {
                let length = frame.len();
                match service.handle(frame.buffer_mut(), length) {
                    Ok(length) => {
                        frame.convert_in_place(service.response_opcode(), length);
                        Disposition::answered(service.is_broadcast())
                    }
                    Err(_) => {
                        frame.abort(AbortReason::InvalidOperand);
                        Disposition::aborted(AbortReason::InvalidOperand)
                    }
                }
            }
            None => {
                frame.abort(AbortReason::UnrecognizedOpcode);
                Disposition::aborted(AbortReason::UnrecognizedOpcode)
            }
        };
        drop(services);

        tracing::info!(
            "Processed {:#04x} into {:#04x} ({}), {} bytes, broadcast: {}",
            request,
            frame.opcode(),
            Opcode::name_of(frame.opcode()),
            frame.len(),
            disposition.broadcast
        );

        disposition
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

fn same_service(a: &Arc<dyn Service>, b: &Arc<dyn Service>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Keeps a service announced for as long as it lives.
pub struct ServiceGuard {
    processor: Weak<Processor>,
    service: Arc<dyn Service>,
    announced: bool,
}

impl ServiceGuard {
    /// Whether the service made it into the table.
    pub fn is_announced(&self) -> bool {
        self.announced
    }

    /// Request opcode of the guarded service.
    pub fn opcode(&self) -> u8 {
        self.service.request_opcode()
    }
}

impl Drop for ServiceGuard {
    fn drop(&mut self) {
        if !self.announced {
            return;
        }
        if let Some(processor) = self.processor.upgrade() {
            processor.revoke(&self.service);
        }
    }
}
