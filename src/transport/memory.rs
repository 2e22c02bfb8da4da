//! In-process CEC bus.
//!
//! Every attached [`BusPort`] owns one logical address. A transmit is
//! encoded to the wire format, recorded, and delivered synchronously to the
//! destination port (or every other port on broadcast). A direct frame
//! without a listener at its destination is not acknowledged.
//!
//! # Example
//!
//! ```
//! use cec_control::protocol::LogicalAddress;
//! use cec_control::transport::{DeviceAdapter, MemoryBus};
//!
//! let bus = MemoryBus::new();
//! let tv = bus.attach(LogicalAddress::Tv);
//!
//! // Nobody listens on Playback1
//! assert!(tv.transmit(LogicalAddress::Tv, LogicalAddress::Playback1, &[0x8C]).is_err());
//! // Broadcasts are always acknowledged
//! assert!(tv.transmit(LogicalAddress::Tv, LogicalAddress::Broadcast, &[0x36]).is_ok());
//! // Both frames went on the wire
//! assert_eq!(bus.traffic(), vec![vec![0x04, 0x8C], vec![0x0F, 0x36]]);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::{DeviceAdapter, FrameSink};
use crate::error::{CecError, Result};
use crate::protocol::{build_frame, build_poll, parse_frame, Header, LogicalAddress, OperationFrame};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct PortState {
    address: LogicalAddress,
    connected: AtomicBool,
    sink: Mutex<Option<Weak<dyn FrameSink>>>,
}

/// Shared simulated bus.
pub struct MemoryBus {
    ports: Mutex<Vec<Arc<PortState>>>,
    traffic: Mutex<Vec<Vec<u8>>>,
}

impl MemoryBus {
    /// Create an empty bus.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ports: Mutex::new(Vec::new()),
            traffic: Mutex::new(Vec::new()),
        })
    }

    /// Attach a device listening on `address`.
    pub fn attach(self: &Arc<Self>, address: LogicalAddress) -> Arc<BusPort> {
        let state = Arc::new(PortState {
            address,
            connected: AtomicBool::new(true),
            sink: Mutex::new(None),
        });
        lock(&self.ports).push(state.clone());

        Arc::new(BusPort {
            bus: self.clone(),
            state,
        })
    }

    /// Every frame put on the bus so far, in wire format.
    pub fn traffic(&self) -> Vec<Vec<u8>> {
        lock(&self.traffic).clone()
    }

    /// Forget the recorded traffic.
    pub fn clear_traffic(&self) {
        lock(&self.traffic).clear();
    }

    fn deliver(&self, from: &PortState, wire: Vec<u8>) -> Result<()> {
        let (header, frame) = parse_frame(&wire)?;
        lock(&self.traffic).push(wire);

        // Snapshot the listeners so no bus lock is held while sinks run
        let listeners: Vec<Option<Weak<dyn FrameSink>>> = lock(&self.ports)
            .iter()
            .filter(|port| !std::ptr::eq(port.as_ref(), from))
            .filter(|port| port.connected.load(Ordering::Acquire))
            .filter(|port| header.is_broadcast() || port.address == header.destination)
            .map(|port| lock(&port.sink).clone())
            .collect();

        if listeners.is_empty() && !header.is_broadcast() {
            return Err(CecError::Nack(header.destination));
        }

        let data = frame.map(|frame| frame.to_bytes()).unwrap_or_default();
        for sink in listeners.into_iter().flatten() {
            if let Some(sink) = sink.upgrade() {
                sink.received(header.initiator, header.destination, &data);
            }
        }
        Ok(())
    }
}

/// One device's connection to a [`MemoryBus`].
pub struct BusPort {
    bus: Arc<MemoryBus>,
    state: Arc<PortState>,
}

impl BusPort {
    /// Address this port listens on.
    pub fn address(&self) -> LogicalAddress {
        self.state.address
    }

    /// Disconnect from the bus. The port becomes invalid.
    pub fn detach(&self) {
        self.state.connected.store(false, Ordering::Release);
    }

    /// Send a polling message (header block only).
    pub fn poll(&self, destination: LogicalAddress) -> Result<()> {
        let header = Header::new(self.state.address, destination);
        self.bus.deliver(&self.state, build_poll(&header))
    }
}

impl DeviceAdapter for BusPort {
    fn transmit(
        &self,
        initiator: LogicalAddress,
        destination: LogicalAddress,
        data: &[u8],
    ) -> Result<()> {
        if !self.is_valid() {
            return Err(CecError::ConnectionClosed);
        }

        let header = Header::new(initiator, destination);
        let wire = if data.is_empty() {
            build_poll(&header)
        } else {
            build_frame(&header, &OperationFrame::decode(data)?)
        };
        self.bus.deliver(&self.state, wire)
    }

    fn subscribe(&self, sink: Weak<dyn FrameSink>) {
        *lock(&self.state.sink) = Some(sink);
    }

    fn is_valid(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }
}
