//! Transport strategies: how a record travels from producer to consumer.
//!
//! Two implementations share the [`Transport`] contract:
//!
//! * [`CopyTransport`] pushes the whole record by value through a bounded
//!   ring. Each handoff copies the payload in and copies it out again.
//! * [`PoolTransport`] fills a pre-allocated slot in place and passes a
//!   four-byte slot index through the data ring. Handoff cost is constant.
//!
//! [`Strategy`] picks one of the two at start-up and dispatches to it for the
//! rest of the process lifetime.
//!
//! `emit*` never blocks, allocates or logs, so it is safe to drive from a
//! periodic callback. `receive` parks the calling thread until a record
//! arrives.

use crate::claim::SideClaim;
use crate::copy_ring::CopyRing;
use crate::record::Record;
use crate::slot_pool::{BufferPool, Owned, PoolOccupancy, SlotHandle};
use crate::{TransportResult, DEFAULT_PAYLOAD_SIZE};
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// Default capacity of the copy channel.
pub const DEFAULT_CHANNEL_CAPACITY: u32 = 10;
/// Default number of pool slots.
pub const DEFAULT_POOL_SIZE: u32 = 16;

/// Which transport to build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Full-payload copy through a bounded channel.
    Copy,
    /// Slot-index handoff through a buffer pool.
    Pool,
}

impl StrategyKind {
    /// Capacity used when none is configured.
    pub fn default_capacity(self) -> u32 {
        match self {
            StrategyKind::Copy => DEFAULT_CHANNEL_CAPACITY,
            StrategyKind::Pool => DEFAULT_POOL_SIZE,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrategyKind::Copy => "copy",
            StrategyKind::Pool => "pool",
        })
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "copy" | "naive" => Ok(StrategyKind::Copy),
            "pool" | "zero-copy" | "zerocopy" => Ok(StrategyKind::Pool),
            other => Err(format!("unknown transport strategy `{other}`")),
        }
    }
}

/// Why an emit did not deliver its record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The copy channel was at capacity.
    QueueFull,
    /// No free slot was left in the buffer pool.
    PoolExhausted,
}

/// Result of a non-blocking emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EmitOutcome {
    /// The record is on its way to the consumer.
    Sent,
    /// The record was discarded; nothing was enqueued.
    Dropped(DropReason),
}

impl EmitOutcome {
    /// Returns true for [`EmitOutcome::Sent`].
    pub fn is_sent(self) -> bool {
        matches!(self, EmitOutcome::Sent)
    }
}

/// A record handed to the consumer.
///
/// Dereferences to the record either way. Pass it back through
/// [`Transport::release`] (or drop it) once processing is done; for the pool
/// strategy that returns the slot to the free ring.
#[allow(clippy::large_enum_variant)]
pub enum Received<'a, const N: usize> {
    /// Consumer-owned copy taken out of the channel.
    Copied(Record<N>),
    /// Pool slot read in place.
    Pooled(Owned<'a, N>),
}

impl<const N: usize> Received<'_, N> {
    /// Pool slot backing this record, if any.
    pub fn handle(&self) -> Option<SlotHandle> {
        match self {
            Received::Copied(_) => None,
            Received::Pooled(owned) => Some(owned.handle()),
        }
    }
}

impl<const N: usize> Deref for Received<'_, N> {
    type Target = Record<N>;

    fn deref(&self) -> &Record<N> {
        match self {
            Received::Copied(record) => record,
            Received::Pooled(owned) => &**owned,
        }
    }
}

impl<const N: usize> fmt::Debug for Received<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Received::Copied(record) => f
                .debug_struct("Copied")
                .field("sequence", &record.sequence)
                .field("timestamp", &record.timestamp)
                .finish(),
            Received::Pooled(owned) => fmt::Debug::fmt(owned, f),
        }
    }
}

/// Uniform producer/consumer contract shared by both strategies.
///
/// Exactly one thread may emit and exactly one thread may receive at a time.
/// Overlapping calls on the same side panic.
pub trait Transport<const N: usize = DEFAULT_PAYLOAD_SIZE>: Send + Sync {
    /// Strategy implemented by this transport.
    fn kind(&self) -> StrategyKind;

    /// Channel capacity or pool size.
    fn capacity(&self) -> u32;

    /// Records emitted but not yet received.
    fn pending(&self) -> u32;

    /// Emits a record built by `fill` without blocking.
    ///
    /// `fill` receives the storage the record will travel in and writes every
    /// field it cares about. On a pool drop `fill` is never called.
    fn emit_with<F>(&self, fill: F) -> EmitOutcome
    where
        F: FnOnce(&mut Record<N>);

    /// Emits a copy of `record` without blocking.
    fn emit(&self, record: &Record<N>) -> EmitOutcome {
        self.emit_with(|slot| slot.clone_from(record))
    }

    /// Waits for the next record.
    fn receive(&self) -> Received<'_, N>;

    /// Returns the next record if one is ready.
    fn try_receive(&self) -> Option<Received<'_, N>>;

    /// Gives a received record back to the transport.
    fn release(&self, received: Received<'_, N>) {
        drop(received);
    }
}

/// Copy strategy: records move by value through a bounded ring.
pub struct CopyTransport<const N: usize = DEFAULT_PAYLOAD_SIZE> {
    ring: CopyRing<N>,
    staging: Box<UnsafeCell<Record<N>>>,
    producer: SideClaim,
    consumer: SideClaim,
}

// SAFETY: `staging` is only touched while the producer claim is held, which
// admits a single thread at a time. Everything else is Sync on its own.
unsafe impl<const N: usize> Sync for CopyTransport<N> {}

impl<const N: usize> CopyTransport<N> {
    /// Allocates a channel of `capacity` records.
    pub fn new(capacity: u32) -> TransportResult<Self> {
        Ok(Self {
            ring: CopyRing::new(capacity)?,
            staging: Box::new(UnsafeCell::new(Record::zeroed())),
            producer: SideClaim::new("producer"),
            consumer: SideClaim::new("consumer"),
        })
    }

    fn push(&self, record: &Record<N>) -> EmitOutcome {
        if self.ring.try_push(record) {
            EmitOutcome::Sent
        } else {
            EmitOutcome::Dropped(DropReason::QueueFull)
        }
    }
}

impl<const N: usize> Transport<N> for CopyTransport<N> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Copy
    }

    fn capacity(&self) -> u32 {
        self.ring.capacity()
    }

    fn pending(&self) -> u32 {
        self.ring.len()
    }

    /// Builds the record in producer-side staging memory, then copies it
    /// into the channel.
    fn emit_with<F>(&self, fill: F) -> EmitOutcome
    where
        F: FnOnce(&mut Record<N>),
    {
        let _side = self.producer.enter();
        // SAFETY: the producer claim grants exclusive access to `staging`.
        let staging = unsafe { &mut *self.staging.get() };
        fill(staging);
        self.push(staging)
    }

    fn emit(&self, record: &Record<N>) -> EmitOutcome {
        let _side = self.producer.enter();
        self.push(record)
    }

    fn receive(&self) -> Received<'_, N> {
        let _side = self.consumer.enter();
        Received::Copied(self.ring.pop_blocking())
    }

    fn try_receive(&self) -> Option<Received<'_, N>> {
        let _side = self.consumer.enter();
        self.ring.try_pop().map(Received::Copied)
    }
}

/// Pool strategy: records are written in place and handed off by slot index.
pub struct PoolTransport<const N: usize = DEFAULT_PAYLOAD_SIZE> {
    pool: BufferPool<N>,
}

impl<const N: usize> PoolTransport<N> {
    /// Allocates `pool_size` slots plus free/data rings of the same capacity.
    pub fn new(pool_size: u32) -> TransportResult<Self> {
        Ok(Self {
            pool: BufferPool::new(pool_size)?,
        })
    }

    /// Current distribution of slots across free/acquired/in-transit/owned.
    pub fn occupancy(&self) -> PoolOccupancy {
        self.pool.occupancy()
    }
}

impl<const N: usize> Transport<N> for PoolTransport<N> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Pool
    }

    fn capacity(&self) -> u32 {
        self.pool.slot_count()
    }

    fn pending(&self) -> u32 {
        self.pool.occupancy().in_transit
    }

    fn emit_with<F>(&self, fill: F) -> EmitOutcome
    where
        F: FnOnce(&mut Record<N>),
    {
        let Some(mut slot) = self.pool.try_acquire() else {
            return EmitOutcome::Dropped(DropReason::PoolExhausted);
        };
        fill(&mut *slot);
        slot.submit();
        EmitOutcome::Sent
    }

    fn receive(&self) -> Received<'_, N> {
        Received::Pooled(self.pool.receive_blocking())
    }

    fn try_receive(&self) -> Option<Received<'_, N>> {
        self.pool.try_receive().map(Received::Pooled)
    }
}

/// Transport chosen once at start-up.
pub enum Strategy<const N: usize = DEFAULT_PAYLOAD_SIZE> {
    /// Full-payload copy.
    Copy(CopyTransport<N>),
    /// Zero-copy slot handoff.
    Pool(PoolTransport<N>),
}

impl<const N: usize> Strategy<N> {
    /// Allocates the backing ring or pool for `kind`.
    ///
    /// `capacity` is the channel depth for [`StrategyKind::Copy`] and the
    /// slot count for [`StrategyKind::Pool`]. Fails only if the capacity is
    /// out of range or the allocation fails; nothing is half-built on error.
    pub fn init(kind: StrategyKind, capacity: u32) -> TransportResult<Self> {
        Ok(match kind {
            StrategyKind::Copy => Strategy::Copy(CopyTransport::new(capacity)?),
            StrategyKind::Pool => Strategy::Pool(PoolTransport::new(capacity)?),
        })
    }

    /// Pool occupancy, for the pool strategy.
    pub fn occupancy(&self) -> Option<PoolOccupancy> {
        match self {
            Strategy::Copy(_) => None,
            Strategy::Pool(pool) => Some(pool.occupancy()),
        }
    }
}

impl<const N: usize> Transport<N> for Strategy<N> {
    fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Copy(t) => t.kind(),
            Strategy::Pool(t) => t.kind(),
        }
    }

    fn capacity(&self) -> u32 {
        match self {
            Strategy::Copy(t) => t.capacity(),
            Strategy::Pool(t) => t.capacity(),
        }
    }

    fn pending(&self) -> u32 {
        match self {
            Strategy::Copy(t) => t.pending(),
            Strategy::Pool(t) => t.pending(),
        }
    }

    fn emit_with<F>(&self, fill: F) -> EmitOutcome
    where
        F: FnOnce(&mut Record<N>),
    {
        match self {
            Strategy::Copy(t) => t.emit_with(fill),
            Strategy::Pool(t) => t.emit_with(fill),
        }
    }

    fn emit(&self, record: &Record<N>) -> EmitOutcome {
        match self {
            Strategy::Copy(t) => t.emit(record),
            Strategy::Pool(t) => t.emit(record),
        }
    }

    fn receive(&self) -> Received<'_, N> {
        match self {
            Strategy::Copy(t) => t.receive(),
            Strategy::Pool(t) => t.receive(),
        }
    }

    fn try_receive(&self) -> Option<Received<'_, N>> {
        match self {
            Strategy::Copy(t) => t.try_receive(),
            Strategy::Pool(t) => t.try_receive(),
        }
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use crate::TransportError;

    fn stamp(sequence: u32) -> impl FnOnce(&mut Record<64>) {
        move |record| {
            record.sequence = sequence;
            record.timestamp = 1_000 + i64::from(sequence);
            record.payload.fill(sequence as u8);
            record.stamp_markers();
        }
    }

    #[test]
    fn strategy_kind_parses_aliases() {
        assert_eq!("copy".parse(), Ok(StrategyKind::Copy));
        assert_eq!("Zero-Copy".parse(), Ok(StrategyKind::Pool));
        assert!("mailbox".parse::<StrategyKind>().is_err());
        assert_eq!(StrategyKind::Pool.to_string(), "pool");
    }

    #[test]
    fn zero_capacity_fails_init() {
        for kind in [StrategyKind::Copy, StrategyKind::Pool] {
            assert!(matches!(
                Strategy::<64>::init(kind, 0),
                Err(TransportError::InvalidCapacity { requested: 0, .. })
            ));
        }
    }

    #[test]
    fn copy_emit_with_reuses_staging() {
        let transport = CopyTransport::<64>::new(4).expect("copy transport");
        assert_eq!(transport.emit_with(stamp(1)), EmitOutcome::Sent);
        // Staging keeps the previous contents; the fill overwrites what it sets.
        assert_eq!(transport.emit_with(|r| r.sequence = 2), EmitOutcome::Sent);
        let first = transport.try_receive().expect("first");
        let second = transport.try_receive().expect("second");
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(second.payload, first.payload);
        assert!(first.handle().is_none());
    }

    #[test]
    fn pool_drop_skips_fill() {
        let transport = PoolTransport::<64>::new(1).expect("pool transport");
        assert_eq!(transport.emit_with(stamp(0)), EmitOutcome::Sent);
        let mut called = false;
        let outcome = transport.emit_with(|_| called = true);
        assert_eq!(outcome, EmitOutcome::Dropped(DropReason::PoolExhausted));
        assert!(!called, "payload memory must not be touched on exhaustion");
    }

    #[test]
    fn pool_release_recycles_slot() {
        let transport = PoolTransport::<64>::new(1).expect("pool transport");
        assert!(transport.emit_with(stamp(0)).is_sent());
        let received = transport.receive();
        let handle = received.handle().expect("pooled record carries a handle");
        assert_eq!(received.sequence, 0);
        assert_eq!(transport.occupancy().owned, 1);
        transport.release(received);

        assert!(transport.emit_with(stamp(1)).is_sent());
        let received = transport.receive();
        assert_eq!(received.handle(), Some(handle));
        assert_eq!(received.sequence, 1);
    }

    #[test]
    fn strategy_dispatches_to_selected_transport() {
        let copy = Strategy::<64>::init(StrategyKind::Copy, 3).expect("copy");
        let pool = Strategy::<64>::init(StrategyKind::Pool, 3).expect("pool");
        assert_eq!(copy.kind(), StrategyKind::Copy);
        assert_eq!(pool.kind(), StrategyKind::Pool);
        assert_eq!(copy.capacity(), 3);
        assert!(copy.occupancy().is_none());
        assert_eq!(pool.occupancy().map(|o| o.free), Some(3));

        for strategy in [&copy, &pool] {
            assert!(strategy.emit_with(stamp(5)).is_sent());
            assert_eq!(strategy.pending(), 1);
            let received = strategy.receive();
            assert_eq!(received.sequence, 5);
            strategy.release(received);
            assert_eq!(strategy.pending(), 0);
        }
    }
}
