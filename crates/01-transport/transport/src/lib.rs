//! Bounded, interrupt-safe record handoff between a producer and a consumer
//! running on different cores.
//!
//! * [`Record`] – fixed-size, sequence- and time-stamped payload with sentinel bytes.
//! * [`Strategy`] / [`Transport`] – the uniform emit/receive/release contract,
//!   implemented by [`CopyTransport`] (bounded channel, full copy) and
//!   [`PoolTransport`] (buffer pool, slot-index handoff).
//! * [`SharedRegion`] – aligned, zeroed memory backing channel and pool slots.
//! * [`TransportError`] – initialisation failures; overload is an
//!   [`EmitOutcome`], never an error.

mod arena;
mod claim;
mod copy_ring;
mod cursor;
mod error;
mod index_ring;
mod record;
mod region;
mod slot_pool;
mod strategy;
mod wait;

pub use arena::{MAX_SLOTS, SLOT_ALIGNMENT};
pub use error::{TransportError, TransportResult};
pub use record::{Record, SentinelMismatch, DEFAULT_PAYLOAD_SIZE, HEAD_MARKER, TAIL_MARKER};
pub use region::SharedRegion;
pub use slot_pool::{Owned, PoolOccupancy, SlotHandle};
pub use strategy::{
    CopyTransport, DropReason, EmitOutcome, PoolTransport, Received, Strategy, StrategyKind,
    Transport, DEFAULT_CHANNEL_CAPACITY, DEFAULT_POOL_SIZE,
};
