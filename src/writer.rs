//! Reply queue: a dedicated task that puts answers on the bus.
//!
//! Answers are produced on the receive path, which must never block on the
//! bus. They are queued here and transmitted one at a time by a task that
//! owns the device adapter's transmit side.
//!
//! # Architecture
//!
//! ```text
//! received() ─┐
//! received() ─┼─► mpsc::Sender<OutboundFrame> ─► Writer Task ─► DeviceAdapter::transmit
//! received() ─┘
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{CecError, Result};
use crate::protocol::LogicalAddress;
use crate::transport::{transmit_blocking, DeviceAdapter};

/// Default maximum queued answers.
pub const DEFAULT_MAX_PENDING_FRAMES: usize = 64;

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Maximum frames taken from the queue per wakeup.
const MAX_BATCH_SIZE: usize = 16;

/// An answer waiting to be transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    /// Where the answer goes.
    pub destination: LogicalAddress,
    /// `opcode ++ parameters`.
    pub payload: Bytes,
}

impl OutboundFrame {
    #[inline]
    pub fn new(destination: LogicalAddress, payload: Bytes) -> Self {
        Self {
            destination,
            payload,
        }
    }
}

/// Configuration for the writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Maximum answers queued but not yet transmitted.
    pub max_pending_frames: usize,
    /// Channel capacity for the frame queue.
    pub channel_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_pending_frames: DEFAULT_MAX_PENDING_FRAMES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Handle for queueing answers. Cheap to clone.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<OutboundFrame>,
    pending: Arc<AtomicUsize>,
    max_pending: usize,
}

impl WriterHandle {
    fn new(tx: mpsc::Sender<OutboundFrame>, pending: Arc<AtomicUsize>, max_pending: usize) -> Self {
        Self {
            tx,
            pending,
            max_pending,
        }
    }

    /// Queue a frame without waiting.
    ///
    /// Returns `Err(QueueFull)` immediately if at capacity.
    pub fn try_send(&self, frame: OutboundFrame) -> Result<()> {
        if self.pending.load(Ordering::Acquire) >= self.max_pending {
            return Err(CecError::QueueFull);
        }

        self.pending.fetch_add(1, Ordering::AcqRel);

        self.tx.try_send(frame).map_err(|e| {
            self.pending.fetch_sub(1, Ordering::Release);
            match e {
                mpsc::error::TrySendError::Full(_) => CecError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => CecError::ConnectionClosed,
            }
        })
    }

    /// Frames queued but not yet transmitted.
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

/// Spawn the writer task transmitting as `initiator` on `device`.
///
/// The task ends once every [`WriterHandle`] is dropped.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn spawn_writer_task(
    device: Arc<dyn DeviceAdapter>,
    initiator: LogicalAddress,
    config: WriterConfig,
) -> (WriterHandle, JoinHandle<Result<()>>) {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let pending = Arc::new(AtomicUsize::new(0));

    let handle = WriterHandle::new(tx, pending.clone(), config.max_pending_frames);
    let task = tokio::spawn(writer_loop(rx, device, initiator, pending));

    (handle, task)
}

async fn writer_loop(
    mut rx: mpsc::Receiver<OutboundFrame>,
    device: Arc<dyn DeviceAdapter>,
    initiator: LogicalAddress,
    pending: Arc<AtomicUsize>,
) -> Result<()> {
    let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);

    loop {
        let received = rx.recv_many(&mut batch, MAX_BATCH_SIZE).await;
        if received == 0 {
            // Channel closed, clean shutdown
            return Ok(());
        }

        // The bus carries one frame at a time
        for frame in batch.drain(..) {
            let result = transmit_blocking(&device, initiator, frame.destination, frame.payload.clone()).await;
            if let Err(e) = result {
                tracing::error!(
                    "Failed to send answer {:02x?} to {:?}: {}",
                    frame.payload.as_ref(),
                    frame.destination,
                    e
                );
            }
        }

        pending.fetch_sub(received, Ordering::Release);
    }
}
