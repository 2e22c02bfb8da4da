//! Transport module - the device adapter seam.
//!
//! A [`DeviceAdapter`] is the raw bus driver: it transmits one frame at a
//! time and delivers received frames to a subscribed [`FrameSink`] from its
//! own context. [`MemoryBus`] is an in-process bus for tests and demos.

mod memory;

use std::sync::{Arc, Weak};

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::LogicalAddress;

pub use memory::{BusPort, MemoryBus};

/// Receiver of raw frames from a device adapter.
///
/// Called on the driver's context; implementations must not block.
pub trait FrameSink: Send + Sync {
    /// A frame from `initiator` addressed to `destination` (`Broadcast` for
    /// everyone). `data` is `opcode ++ parameters`, empty for a polling
    /// message.
    fn received(&self, initiator: LogicalAddress, destination: LogicalAddress, data: &[u8]);
}

/// Raw transmit/receive primitives of a CEC bus driver.
pub trait DeviceAdapter: Send + Sync + 'static {
    /// Send `data` (`opcode ++ parameters`) and wait for the bus result.
    ///
    /// May block until the frame is acknowledged. Callers in this crate run
    /// it on the blocking thread pool, never on a runtime worker.
    fn transmit(
        &self,
        initiator: LogicalAddress,
        destination: LogicalAddress,
        data: &[u8],
    ) -> Result<()>;

    /// Route received frames to `sink` until it is dropped.
    fn subscribe(&self, sink: Weak<dyn FrameSink>);

    /// Whether the driver can be used.
    fn is_valid(&self) -> bool {
        true
    }
}

/// Run [`DeviceAdapter::transmit`] on the blocking thread pool.
pub(crate) async fn transmit_blocking(
    device: &Arc<dyn DeviceAdapter>,
    initiator: LogicalAddress,
    destination: LogicalAddress,
    payload: Bytes,
) -> Result<()> {
    let device = device.clone();
    tokio::task::spawn_blocking(move || device.transmit(initiator, destination, &payload)).await?
}
