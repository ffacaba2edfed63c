//! Record synthesis on the periodic producer context.

use std::marker::PhantomData;
use std::sync::Arc;

use transport::{EmitOutcome, Transport, DEFAULT_PAYLOAD_SIZE};

use crate::clock::Clock;
use crate::stats::PipelineStats;

/// Builds one record per [`Producer::tick`] and emits it.
///
/// `tick` is safe to call from a callback that must not block: it never
/// waits, allocates or logs, and it gives up on a record instead of retrying.
pub struct Producer<T, C, const N: usize = DEFAULT_PAYLOAD_SIZE> {
    transport: Arc<T>,
    stats: Arc<PipelineStats>,
    clock: C,
    next_sequence: u32,
    _payload: PhantomData<[u8; N]>,
}

impl<T, C, const N: usize> Producer<T, C, N>
where
    T: Transport<N>,
    C: Clock,
{
    /// Creates a producer whose first record carries sequence 0.
    pub fn new(transport: Arc<T>, stats: Arc<PipelineStats>, clock: C) -> Self {
        Self {
            transport,
            stats,
            clock,
            next_sequence: 0,
            _payload: PhantomData,
        }
    }

    /// Sequence number the next tick will use.
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    /// Stamps and emits one record.
    ///
    /// The sequence number advances whether or not the record is delivered,
    /// so the consumer sees gaps where drops happened.
    pub fn tick(&mut self) -> EmitOutcome {
        let sequence = self.next_sequence;
        self.next_sequence = sequence.wrapping_add(1);

        let clock = &self.clock;
        let outcome = self.transport.emit_with(|record| {
            record.sequence = sequence;
            record.timestamp = clock.now_micros();
            record.stamp_markers();
        });
        match outcome {
            EmitOutcome::Sent => self.stats.record_sent(),
            EmitOutcome::Dropped(reason) => self.stats.record_drop(reason),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use transport::{DropReason, PoolTransport};

    #[test]
    fn tick_stamps_sequence_time_and_markers() {
        let transport = Arc::new(PoolTransport::<64>::new(2).expect("pool"));
        let stats = Arc::new(PipelineStats::new());
        let clock = ManualClock::new(7_000);
        let mut producer =
            Producer::<_, _, 64>::new(Arc::clone(&transport), Arc::clone(&stats), clock.clone());

        assert!(producer.tick().is_sent());
        clock.set(7_050);
        assert!(producer.tick().is_sent());

        let first = transport.receive();
        assert_eq!((first.sequence, first.timestamp), (0, 7_000));
        assert!(first.verify_markers().is_ok());
        drop(first);
        let second = transport.receive();
        assert_eq!((second.sequence, second.timestamp), (1, 7_050));
    }

    #[test]
    fn dropped_ticks_still_consume_a_sequence_number() {
        let transport = Arc::new(PoolTransport::<64>::new(1).expect("pool"));
        let stats = Arc::new(PipelineStats::new());
        let mut producer = Producer::<_, _, 64>::new(
            Arc::clone(&transport),
            Arc::clone(&stats),
            ManualClock::new(0),
        );

        assert!(producer.tick().is_sent());
        assert_eq!(
            producer.tick(),
            EmitOutcome::Dropped(DropReason::PoolExhausted)
        );
        assert_eq!(producer.next_sequence(), 2);

        drop(transport.receive());
        assert!(producer.tick().is_sent());
        assert_eq!(transport.receive().sequence, 2);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.sent, 2);
        assert_eq!(snapshot.dropped_pool_exhausted, 1);
    }
}
