//! Adapter builder and exchange runtime.
//!
//! The [`Adapter`] sits between a [`DeviceAdapter`] and local code:
//! 1. Locally initiated exchanges are serialized, transmitted and
//!    matched against incoming frames until answered or timed out
//! 2. Every other incoming frame goes through the [`Processor`] and the
//!    answer is queued on the reply writer
//!
//! # Example
//!
//! ```
//! use cec_control::exchange::ExchangeType;
//! use cec_control::handler::messages::OsdName;
//! use cec_control::protocol::{AdapterRole, LogicalAddress};
//! use cec_control::transport::MemoryBus;
//! use cec_control::{AdapterBuilder, Reply};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> cec_control::Result<()> {
//!     let bus = MemoryBus::new();
//!     let _tv = AdapterBuilder::new(LogicalAddress::Tv)
//!         .role(AdapterRole::Tv)
//!         .osd_name("Living Room")
//!         .build(bus.attach(LogicalAddress::Tv));
//!     let player = AdapterBuilder::new(LogicalAddress::Playback1)
//!         .build(bus.attach(LogicalAddress::Playback1));
//!
//!     let mut name = ExchangeType::new(OsdName::default());
//!     assert_eq!(player.exchange(LogicalAddress::Tv, &mut name).await?, Reply::Answered);
//!     assert_eq!(name.message().name(), "Living Room");
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::control::{DeviceConfig, DEFAULT_WAIT_TIME_MS};
use crate::error::{CecError, Result};
use crate::exchange::{Exchange, Expectation};
use crate::handler::messages::register_defaults;
use crate::handler::{Processor, ServiceGuard};
use crate::protocol::{AbortReason, AdapterRole, LogicalAddress, Opcode, OperationFrame, NO_OPCODE};
use crate::transport::{transmit_blocking, DeviceAdapter, FrameSink};
use crate::writer::{spawn_writer_task, OutboundFrame, WriterConfig, WriterHandle};

/// Default time to wait for an answer.
pub const DEFAULT_WAIT_TIME: Duration = Duration::from_millis(DEFAULT_WAIT_TIME_MS);

/// Outcome of a successful [`Adapter::exchange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// The follower answered and the exchange parsed the answer.
    Answered,
    /// The follower refused the request.
    Aborted(AbortReason),
    /// The request expects no answer and was acknowledged by the bus.
    Sent,
}

/// Builder for an [`Adapter`].
pub struct AdapterBuilder {
    address: LogicalAddress,
    role: AdapterRole,
    wait_time: Duration,
    processor: Option<Arc<Processor>>,
    config: Option<DeviceConfig>,
    writer_config: WriterConfig,
}

impl AdapterBuilder {
    /// Start building an adapter transmitting as `address`.
    ///
    /// The role defaults to the one `address` belongs to.
    pub fn new(address: LogicalAddress) -> Self {
        Self {
            address,
            role: address.role(),
            wait_time: DEFAULT_WAIT_TIME,
            processor: None,
            config: None,
            writer_config: WriterConfig::default(),
        }
    }

    /// Take address, role, wait time and default services from `config`.
    pub fn from_config(config: &DeviceConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Self::new(config.logical_address()?)
            .role(config.role)
            .wait_time(config.wait_time());
        builder.config = Some(config.clone());
        Ok(builder)
    }

    /// Role used to filter which services answer.
    pub fn role(mut self, role: AdapterRole) -> Self {
        self.role = role;
        self
    }

    /// Default wait time of [`Adapter::exchange`].
    ///
    /// Default: 1500 ms
    pub fn wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Answer incoming requests with an existing processor instead of the
    /// default service table.
    pub fn processor(mut self, processor: Arc<Processor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// OSD name answered by the default services.
    pub fn osd_name(mut self, name: impl Into<String>) -> Self {
        self.config.get_or_insert_with(DeviceConfig::default).osd_name = name.into();
        self
    }

    /// Maximum answers queued but not yet transmitted.
    ///
    /// Default: 64
    pub fn max_pending_frames(mut self, limit: usize) -> Self {
        self.writer_config.max_pending_frames = limit;
        self
    }

    /// Reply queue channel capacity.
    ///
    /// Default: 64
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.writer_config.channel_capacity = capacity;
        self
    }

    /// Build the adapter and subscribe it to `device`.
    ///
    /// Without [`processor`](Self::processor), a fresh processor with the
    /// default services is created and kept alive by the adapter.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn build(self, device: Arc<dyn DeviceAdapter>) -> Arc<Adapter> {
        let (processor, services) = match self.processor {
            Some(processor) => (processor, Vec::new()),
            None => {
                let processor = Arc::new(Processor::new());
                let mut config = self.config.unwrap_or_default();
                config.role = self.role;
                let services = register_defaults(&processor, &config);
                (processor, services)
            }
        };

        let (writer, writer_task) = spawn_writer_task(device.clone(), self.address, self.writer_config);

        let adapter = Arc::new(Adapter {
            address: self.address,
            role: self.role,
            device: device.clone(),
            processor,
            writer,
            wait_time: self.wait_time,
            exchange_lock: tokio::sync::Mutex::new(()),
            pending: Mutex::new(None),
            next_id: AtomicU64::new(1),
            _services: services,
            _writer_task: writer_task,
        });

        let sink: Arc<dyn FrameSink> = adapter.clone();
        device.subscribe(Arc::downgrade(&sink));

        tracing::info!(
            "Adapter ready at {:?} as {:?}, wait time {:?}",
            adapter.address,
            adapter.role,
            adapter.wait_time
        );
        adapter
    }
}

/// The exchange currently waiting for its answer.
struct Pending {
    id: u64,
    follower: LogicalAddress,
    expectation: Expectation,
    tx: mpsc::UnboundedSender<(LogicalAddress, OperationFrame)>,
}

/// Clears the pending slot when an exchange ends, however it ends.
///
/// Frames offered to the exchange but never consumed are processed like
/// any other incoming frame.
struct PendingSlot<'a> {
    adapter: &'a Adapter,
    id: u64,
    follower: LogicalAddress,
    rx: mpsc::UnboundedReceiver<(LogicalAddress, OperationFrame)>,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        {
            let mut pending = self.adapter.lock_pending();
            if pending.as_ref().is_some_and(|p| p.id == self.id) {
                *pending = None;
            }
        }

        // Offers happen under the pending lock, so nothing arrives after this
        while let Ok((destination, frame)) = self.rx.try_recv() {
            self.adapter.dispatch(self.follower, destination, frame);
        }
    }
}

/// A running CEC adapter.
pub struct Adapter {
    address: LogicalAddress,
    role: AdapterRole,
    device: Arc<dyn DeviceAdapter>,
    processor: Arc<Processor>,
    writer: WriterHandle,
    wait_time: Duration,
    /// Held for the whole of an exchange.
    exchange_lock: tokio::sync::Mutex<()>,
    /// Checked on the receive path, never held across an await.
    pending: Mutex<Option<Pending>>,
    next_id: AtomicU64,
    _services: Vec<ServiceGuard>,
    _writer_task: JoinHandle<Result<()>>,
}

impl Adapter {
    /// Create a new adapter builder.
    pub fn builder(address: LogicalAddress) -> AdapterBuilder {
        AdapterBuilder::new(address)
    }

    /// Logical address this adapter transmits from.
    pub fn address(&self) -> LogicalAddress {
        self.address
    }

    pub fn role(&self) -> AdapterRole {
        self.role
    }

    /// Processor answering incoming requests.
    pub fn processor(&self) -> &Arc<Processor> {
        &self.processor
    }

    /// Whether the device and the claimed address are usable.
    pub fn is_valid(&self) -> bool {
        self.device.is_valid() && self.address.is_valid()
    }

    /// Answers queued but not yet transmitted.
    pub fn pending_replies(&self) -> usize {
        self.writer.pending_count()
    }

    /// Run `exchange` against `follower` with the default wait time.
    pub async fn exchange(
        &self,
        follower: LogicalAddress,
        exchange: &mut dyn Exchange,
    ) -> Result<Reply> {
        self.exchange_within(follower, exchange, self.wait_time).await
    }

    /// Run `exchange` against `follower`, waiting at most `wait_time` for
    /// the answer.
    ///
    /// Exchanges on one adapter run one at a time. The first frame from
    /// `follower` that parses as the answer, or refuses the request,
    /// completes it. Candidates that fail to parse are processed like any
    /// unsolicited frame.
    pub async fn exchange_within(
        &self,
        follower: LogicalAddress,
        exchange: &mut dyn Exchange,
        wait_time: Duration,
    ) -> Result<Reply> {
        if !self.is_valid() {
            tracing::error!("Exchange attempted on an invalid adapter at {:?}", self.address);
            return Err(CecError::InvalidAdapter);
        }

        let _exclusive = self.exchange_lock.lock().await;

        let mut request = OperationFrame::default();
        exchange.serialize(&mut request);

        if !exchange.answer_expected() {
            self.transmit(follower, request.to_bytes()).await?;
            return Ok(Reply::Sent);
        }

        let expectation = Expectation::of(exchange);
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Armed before transmitting so a fast answer is not missed
        *self.lock_pending() = Some(Pending {
            id,
            follower,
            expectation,
            tx,
        });
        let mut slot = PendingSlot {
            adapter: self,
            id,
            follower,
            rx,
        };

        self.transmit(follower, request.to_bytes()).await?;

        let deadline = tokio::time::Instant::now() + wait_time;
        loop {
            let (destination, answer) = match tokio::time::timeout_at(deadline, slot.rx.recv()).await {
                Ok(Some(received)) => received,
                Ok(None) => return Err(CecError::ConnectionClosed),
                Err(_) => {
                    tracing::debug!(
                        "Exchange {} with {:?} timed out after {:?}",
                        id,
                        follower,
                        wait_time
                    );
                    return Err(CecError::Timeout {
                        follower,
                        opcode: expectation.response,
                    });
                }
            };

            if answer.is_feature_abort() && expectation.response != answer.opcode() {
                if let Some(reason) = answer.abort_reason() {
                    return Ok(Reply::Aborted(reason));
                }
            } else if exchange.deserialize(&answer) {
                return Ok(Reply::Answered);
            }

            // Not a usable answer; treat it like any other incoming frame
            tracing::debug!(
                "Exchange {} rejected {:?} from {:?} as answer to {}",
                id,
                answer,
                follower,
                Opcode::name_of(expectation.request)
            );
            self.dispatch(follower, destination, answer);
        }
    }

    async fn transmit(&self, destination: LogicalAddress, payload: Bytes) -> Result<()> {
        transmit_blocking(&self.device, self.address, destination, payload).await
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand `frame` to the pending exchange if it may be the awaited answer.
    fn offer_to_exchange(
        &self,
        initiator: LogicalAddress,
        destination: LogicalAddress,
        frame: &OperationFrame,
    ) -> bool {
        let pending = self.lock_pending();

        match pending.as_ref() {
            Some(p) if p.follower == initiator && p.expectation.matches(frame) => {
                tracing::debug!("Frame from {:?} offered to exchange {}", initiator, p.id);
                // The waiter may have just timed out
                p.tx.send((destination, *frame)).is_ok()
            }
            _ => false,
        }
    }

    fn dispatch(&self, initiator: LogicalAddress, addressed_to: LogicalAddress, mut frame: OperationFrame) {
        if frame.is_feature_abort() {
            tracing::debug!("Ignoring unsolicited Feature Abort from {:?}: {:?}", initiator, frame);
            return;
        }

        let request = frame.opcode();
        let disposition = self.processor.process_for(self.role, &mut frame);
        if frame.opcode() == NO_OPCODE {
            return;
        }

        // Broadcast requests are never refused
        if addressed_to.is_broadcast() && disposition.abort.is_some() {
            tracing::debug!(
                "Not refusing broadcast {} from {:?}",
                Opcode::name_of(request),
                initiator
            );
            return;
        }

        let destination = if disposition.broadcast {
            LogicalAddress::Broadcast
        } else {
            initiator
        };

        if let Err(e) = self
            .writer
            .try_send(OutboundFrame::new(destination, frame.to_bytes()))
        {
            tracing::warn!("Dropping answer to {:?}: {}", initiator, e);
        }
    }

    #[cfg(test)]
    fn has_pending_exchange(&self) -> bool {
        self.lock_pending().is_some()
    }
}

impl FrameSink for Adapter {
    fn received(&self, initiator: LogicalAddress, destination: LogicalAddress, data: &[u8]) {
        if data.is_empty() {
            tracing::debug!("Polling message from {:?}", initiator);
            return;
        }

        let frame = match OperationFrame::decode(data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Discarding frame from {:?}: {}", initiator, e);
                return;
            }
        };

        if self.offer_to_exchange(initiator, destination, &frame) {
            return;
        }

        self.dispatch(initiator, destination, frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ExchangeType;
    use crate::handler::messages::{OsdName, Standby, VendorId};
    use crate::handler::{Message, ServiceType};
    use crate::protocol::{Opcode, FEATURE_ABORT};
    use crate::transport::{BusPort, MemoryBus};

    async fn flush(adapter: &Adapter) {
        for _ in 0..100 {
            if adapter.pending_replies() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    async fn wait_armed(adapter: &Adapter) {
        for _ in 0..100 {
            if adapter.has_pending_exchange() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("exchange never armed");
    }

    /// Wait until the exchange request is on the wire, then forget it.
    async fn clear_request(bus: &MemoryBus) {
        for _ in 0..100 {
            if !bus.traffic().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        bus.clear_traffic();
    }

    /// A player adapter plus a silent TV port that acknowledges frames.
    fn player_and_silent_tv() -> (Arc<MemoryBus>, Arc<Adapter>, Arc<BusPort>) {
        let bus = MemoryBus::new();
        let tv = bus.attach(LogicalAddress::Tv);
        let player = AdapterBuilder::new(LogicalAddress::Playback1)
            .build(bus.attach(LogicalAddress::Playback1));
        (bus, player, tv)
    }

    #[test]
    fn test_builder_defaults() {
        let builder = AdapterBuilder::new(LogicalAddress::Tuner2);
        assert_eq!(builder.role, AdapterRole::Tuner);
        assert_eq!(builder.wait_time, Duration::from_millis(1500));
        assert!(builder.processor.is_none());
    }

    #[test]
    fn test_builder_from_config() {
        let config = DeviceConfig::from_json(
            r#"{ "role": "tv", "logical_address": 0, "wait_time_ms": 200 }"#,
        )
        .unwrap();

        let builder = AdapterBuilder::from_config(&config).unwrap();
        assert_eq!(builder.address, LogicalAddress::Tv);
        assert_eq!(builder.role, AdapterRole::Tv);
        assert_eq!(builder.wait_time, Duration::from_millis(200));
    }

    #[test]
    fn test_builder_configuration() {
        let builder = AdapterBuilder::new(LogicalAddress::Tv)
            .max_pending_frames(8)
            .channel_capacity(4)
            .wait_time(Duration::from_millis(10));

        assert_eq!(builder.writer_config.max_pending_frames, 8);
        assert_eq!(builder.writer_config.channel_capacity, 4);
        assert_eq!(builder.wait_time, Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_exchange_answered() {
        let bus = MemoryBus::new();
        let _tv = AdapterBuilder::new(LogicalAddress::Tv).build(bus.attach(LogicalAddress::Tv));
        let player = AdapterBuilder::new(LogicalAddress::Playback1)
            .build(bus.attach(LogicalAddress::Playback1));

        let mut vendor = ExchangeType::new(VendorId::default());
        let reply = player.exchange(LogicalAddress::Tv, &mut vendor).await.unwrap();

        assert_eq!(reply, Reply::Answered);
        assert_eq!(vendor.message().id, 0x000D36);
        assert!(!player.has_pending_exchange());
    }

    #[tokio::test]
    async fn test_exchange_without_answer() {
        let (bus, player, _tv) = player_and_silent_tv();

        let mut standby = ExchangeType::new(Standby);
        let reply = player.exchange(LogicalAddress::Tv, &mut standby).await.unwrap();

        assert_eq!(reply, Reply::Sent);
        assert_eq!(bus.traffic(), vec![vec![0x40, Opcode::Standby.raw()]]);
    }

    #[tokio::test]
    async fn test_exchange_nack() {
        let bus = MemoryBus::new();
        let player = AdapterBuilder::new(LogicalAddress::Playback1)
            .build(bus.attach(LogicalAddress::Playback1));

        let mut name = ExchangeType::new(OsdName::default());
        let result = player.exchange(LogicalAddress::Tv, &mut name).await;

        assert!(matches!(result, Err(CecError::Nack(LogicalAddress::Tv))));
        assert!(!player.has_pending_exchange());
    }

    #[tokio::test]
    async fn test_exchange_timeout_clears_slot() {
        let (_bus, player, _tv) = player_and_silent_tv();

        let mut name = ExchangeType::new(OsdName::default());
        let result = player
            .exchange_within(LogicalAddress::Tv, &mut name, Duration::from_millis(50))
            .await;

        assert!(matches!(
            result,
            Err(CecError::Timeout {
                follower: LogicalAddress::Tv,
                opcode: 0x47
            })
        ));
        assert!(!player.has_pending_exchange());
    }

    #[tokio::test]
    async fn test_late_answer_goes_to_processor() {
        let (bus, player, _tv) = player_and_silent_tv();

        let mut vendor = ExchangeType::new(VendorId::default());
        let _ = player
            .exchange_within(LogicalAddress::Tv, &mut vendor, Duration::from_millis(20))
            .await;
        bus.clear_traffic();

        // Nobody serves <Device Vendor ID>, so the late frame is refused
        player.received(LogicalAddress::Tv, LogicalAddress::Playback1, &[0x87, 0x00, 0x0D, 0x36]);
        flush(&player).await;

        assert_eq!(bus.traffic(), vec![vec![0x40, FEATURE_ABORT, 0x00]]);
    }

    #[tokio::test]
    async fn test_answer_only_from_follower() {
        let (bus, player, _tv) = player_and_silent_tv();
        let _tuner = bus.attach(LogicalAddress::Tuner1);

        let exchanging = player.clone();
        let task = tokio::spawn(async move {
            let mut vendor = ExchangeType::new(VendorId::default());
            let reply = exchanging.exchange(LogicalAddress::Tv, &mut vendor).await;
            (reply, vendor.into_inner())
        });
        wait_armed(&player).await;
        clear_request(&bus).await;

        // Same opcode from someone else is an ordinary incoming frame
        player.received(LogicalAddress::Tuner1, LogicalAddress::Playback1, &[0x87, 0x11, 0x22, 0x33]);
        assert!(player.has_pending_exchange());

        player.received(LogicalAddress::Tv, LogicalAddress::Playback1, &[0x87, 0x00, 0x0D, 0x36]);
        let (reply, vendor) = task.await.unwrap();

        assert_eq!(reply.unwrap(), Reply::Answered);
        assert_eq!(vendor.id, 0x000D36);

        flush(&player).await;
        assert_eq!(bus.traffic(), vec![vec![0x43, FEATURE_ABORT, 0x00]]);
    }

    #[tokio::test]
    async fn test_exchange_refused() {
        let (_bus, player, _tv) = player_and_silent_tv();

        let exchanging = player.clone();
        let task = tokio::spawn(async move {
            let mut vendor = ExchangeType::new(VendorId::default());
            exchanging.exchange(LogicalAddress::Tv, &mut vendor).await
        });
        wait_armed(&player).await;

        player.received(
            LogicalAddress::Tv,
            LogicalAddress::Playback1,
            &[FEATURE_ABORT, Opcode::GiveDeviceVendorId.raw(), AbortReason::Refused.raw()],
        );

        assert_eq!(task.await.unwrap().unwrap(), Reply::Aborted(AbortReason::Refused));
    }

    #[tokio::test]
    async fn test_malformed_answer_forwarded() {
        let (bus, player, _tv) = player_and_silent_tv();

        let exchanging = player.clone();
        let task = tokio::spawn(async move {
            let mut vendor = ExchangeType::new(VendorId::default());
            let reply = exchanging.exchange(LogicalAddress::Tv, &mut vendor).await;
            (reply, vendor.into_inner())
        });
        wait_armed(&player).await;
        clear_request(&bus).await;

        // Too short to be a vendor id; answered like an unsolicited frame
        player.received(LogicalAddress::Tv, LogicalAddress::Playback1, &[0x87, 0x00]);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(player.has_pending_exchange());

        player.received(LogicalAddress::Tv, LogicalAddress::Playback1, &[0x87, 0x00, 0x0D, 0x36]);
        let (reply, vendor) = task.await.unwrap();

        assert_eq!(reply.unwrap(), Reply::Answered);
        assert_eq!(vendor.id, 0x000D36);

        flush(&player).await;
        assert_eq!(bus.traffic(), vec![vec![0x40, FEATURE_ABORT, 0x00]]);
    }

    #[tokio::test]
    async fn test_frames_queued_behind_answer_are_processed() {
        let (bus, player, _tv) = player_and_silent_tv();

        let exchanging = player.clone();
        let task = tokio::spawn(async move {
            let mut vendor = ExchangeType::new(VendorId::default());
            let reply = exchanging.exchange(LogicalAddress::Tv, &mut vendor).await;
            (reply, vendor.into_inner())
        });
        wait_armed(&player).await;
        clear_request(&bus).await;

        // Both match the exchange before it gets to run
        player.received(LogicalAddress::Tv, LogicalAddress::Playback1, &[0x87, 0x00, 0x0D, 0x36]);
        player.received(LogicalAddress::Tv, LogicalAddress::Playback1, &[0x87, 0x11, 0x22, 0x33]);
        let (reply, vendor) = task.await.unwrap();

        assert_eq!(reply.unwrap(), Reply::Answered);
        assert_eq!(vendor.id, 0x000D36);
        assert!(!player.has_pending_exchange());

        // The second one is refused like any unsolicited <Device Vendor ID>
        flush(&player).await;
        assert_eq!(bus.traffic(), vec![vec![0x40, FEATURE_ABORT, 0x00]]);
    }

    #[tokio::test]
    async fn test_broadcast_request_never_refused() {
        let (bus, player, _tv) = player_and_silent_tv();

        // Nobody serves these; a directed copy would be refused
        player.received(LogicalAddress::Tv, LogicalAddress::Broadcast, &[0x99]);
        player.received(LogicalAddress::Tv, LogicalAddress::Broadcast, &[0x87, 0x00, 0x0D, 0x36]);
        flush(&player).await;
        assert!(bus.traffic().is_empty());

        // Served broadcast requests are still answered
        player.received(LogicalAddress::Tv, LogicalAddress::Broadcast, &[Opcode::GivePhysicalAddr.raw()]);
        flush(&player).await;
        assert_eq!(bus.traffic(), vec![vec![0x4F, 0x84, 0x10, 0x00, 0x04]]);
    }

    #[tokio::test]
    async fn test_broadcast_answer() {
        let (bus, player, _tv) = player_and_silent_tv();

        player.received(LogicalAddress::Tv, LogicalAddress::Playback1, &[Opcode::GivePhysicalAddr.raw()]);
        flush(&player).await;

        assert_eq!(bus.traffic(), vec![vec![0x4F, 0x84, 0x10, 0x00, 0x04]]);
    }

    #[tokio::test]
    async fn test_silent_frames() {
        let (bus, player, _tv) = player_and_silent_tv();

        // Polling message
        player.received(LogicalAddress::Tv, LogicalAddress::Playback1, &[]);
        // Unsolicited refusal
        player.received(LogicalAddress::Tv, LogicalAddress::Playback1, &[FEATURE_ABORT, 0x46, 0x00]);
        // Request whose answer is no frame at all
        player.received(LogicalAddress::Tv, LogicalAddress::Playback1, &[Opcode::Standby.raw()]);
        flush(&player).await;

        assert!(bus.traffic().is_empty());
    }

    #[tokio::test]
    async fn test_shared_processor_and_role() {
        #[derive(Default)]
        struct Deck;

        impl Message for Deck {
            const REQUEST: Opcode = Opcode::GiveDeckStatus;
            const RESPONSE: Opcode = Opcode::DeckStatus;

            fn process(&self, buffer: &mut [u8], _length: usize) -> usize {
                buffer[0] = 0x11;
                1
            }
        }

        let processor = Arc::new(Processor::new());
        let _deck = processor.register(
            ServiceType::new(Deck).roles(crate::protocol::RoleMask::RECORDER),
        );

        let bus = MemoryBus::new();
        let _tv = bus.attach(LogicalAddress::Tv);
        let recorder = AdapterBuilder::new(LogicalAddress::Record1)
            .processor(processor.clone())
            .build(bus.attach(LogicalAddress::Record1));
        let player = AdapterBuilder::new(LogicalAddress::Playback1)
            .processor(processor)
            .build(bus.attach(LogicalAddress::Playback1));

        recorder.received(LogicalAddress::Tv, LogicalAddress::Record1, &[Opcode::GiveDeckStatus.raw(), 0x01]);
        player.received(LogicalAddress::Tv, LogicalAddress::Playback1, &[Opcode::GiveDeckStatus.raw(), 0x01]);
        flush(&recorder).await;
        flush(&player).await;

        let traffic = bus.traffic();
        assert!(traffic.contains(&vec![0x10, Opcode::DeckStatus.raw(), 0x11]));
        assert!(traffic.contains(&vec![0x40, FEATURE_ABORT, 0x00]));
    }

    #[tokio::test]
    async fn test_invalid_adapter() {
        let (_bus, player, _tv) = player_and_silent_tv();
        let port = MemoryBus::new().attach(LogicalAddress::Playback1);
        port.detach();
        let detached = AdapterBuilder::new(LogicalAddress::Playback1).build(port);

        assert!(player.is_valid());
        assert!(!detached.is_valid());

        let mut name = ExchangeType::new(OsdName::default());
        let result = detached.exchange(LogicalAddress::Tv, &mut name).await;
        assert!(matches!(result, Err(CecError::InvalidAdapter)));
    }
}
