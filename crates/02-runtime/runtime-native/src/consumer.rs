//! The long-lived consumer task.

use std::hint;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};
use transport::{Record, SentinelMismatch, Transport, DEFAULT_PAYLOAD_SIZE};

use crate::clock::Clock;
use crate::stats::PipelineStats;

/// What the consumer observed for one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Consumed {
    /// Sequence number carried by the record.
    pub sequence: u32,
    /// Sentinel bytes found, when they did not verify.
    pub corruption: Option<SentinelMismatch>,
    /// Producer-to-consumer latency, when this record was sampled.
    pub latency_us: Option<i64>,
}

/// Receives, verifies, samples and releases records.
pub struct Consumer<T, C, const N: usize = DEFAULT_PAYLOAD_SIZE> {
    transport: Arc<T>,
    inspector: Inspector<C>,
    _payload: PhantomData<[u8; N]>,
}

struct Inspector<C> {
    stats: Arc<PipelineStats>,
    clock: C,
    sample_every: u64,
    work: Duration,
    consumed: u64,
}

impl<T, C, const N: usize> Consumer<T, C, N>
where
    T: Transport<N>,
    C: Clock,
{
    /// Creates a consumer sampling latency on every `sample_every`-th record
    /// and spending `work` on each record before releasing it.
    ///
    /// A `sample_every` of zero is treated as 1.
    pub fn new(
        transport: Arc<T>,
        stats: Arc<PipelineStats>,
        clock: C,
        sample_every: u32,
        work: Duration,
    ) -> Self {
        Self {
            transport,
            inspector: Inspector {
                stats,
                clock,
                sample_every: u64::from(sample_every.max(1)),
                work,
                consumed: 0,
            },
            _payload: PhantomData,
        }
    }

    /// Records consumed by this consumer so far.
    pub fn consumed(&self) -> u64 {
        self.inspector.consumed
    }

    /// Blocks for the next record and processes it.
    pub fn process_one(&mut self) -> Consumed {
        let received = self.transport.receive();
        let consumed = self.inspector.inspect(&*received);
        self.transport.release(received);
        consumed
    }

    /// Processes the next record if one is waiting.
    pub fn try_process_one(&mut self) -> Option<Consumed> {
        let received = self.transport.try_receive()?;
        let consumed = self.inspector.inspect(&*received);
        self.transport.release(received);
        Some(consumed)
    }

    /// Processes exactly `count` records, blocking as needed.
    pub fn run_for(&mut self, count: u64) {
        for _ in 0..count {
            self.process_one();
        }
    }

    /// Processes records forever.
    pub fn run(mut self) -> ! {
        loop {
            self.process_one();
        }
    }
}

impl<C: Clock> Inspector<C> {
    fn inspect<const N: usize>(&mut self, record: &Record<N>) -> Consumed {
        let corruption = record.verify_markers().err();
        if let Some(mismatch) = corruption {
            self.stats.record_corruption();
            error!(
                sequence = record.sequence,
                head = mismatch.head,
                tail = mismatch.tail,
                "sentinel mismatch, record corrupted"
            );
        }

        self.consumed += 1;
        self.stats.record_consumed();

        let latency_us = (self.consumed % self.sample_every == 0).then(|| {
            let latency = self
                .clock
                .now_micros()
                .saturating_sub(record.timestamp)
                .max(0);
            self.stats.record_latency(latency);
            info!(
                sequence = record.sequence,
                latency_us = latency,
                dropped = self.stats.dropped(),
                "latency sample"
            );
            latency
        });

        spin_for(self.work);

        Consumed {
            sequence: record.sequence,
            corruption,
            latency_us,
        }
    }
}

fn spin_for(work: Duration) {
    if work.is_zero() {
        return;
    }
    let start = Instant::now();
    while start.elapsed() < work {
        hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use transport::CopyTransport;

    fn stamped(sequence: u32, timestamp: i64) -> Record<32> {
        let mut record = Record::zeroed();
        record.sequence = sequence;
        record.timestamp = timestamp;
        record.stamp_markers();
        record
    }

    fn consumer(
        sample_every: u32,
        clock: ManualClock,
    ) -> (
        Arc<CopyTransport<32>>,
        Arc<PipelineStats>,
        Consumer<CopyTransport<32>, ManualClock, 32>,
    ) {
        let transport = Arc::new(CopyTransport::new(8).expect("copy transport"));
        let stats = Arc::new(PipelineStats::new());
        let consumer = Consumer::new(
            Arc::clone(&transport),
            Arc::clone(&stats),
            clock,
            sample_every,
            Duration::ZERO,
        );
        (transport, stats, consumer)
    }

    #[test]
    fn samples_every_kth_record_by_consumed_count() {
        let clock = ManualClock::new(1_000);
        let (transport, stats, mut consumer) = consumer(3, clock);
        // Sequence numbers deliberately skip, as they do after drops.
        for sequence in [0, 5, 6, 9, 10, 11, 12] {
            assert!(transport.emit(&stamped(sequence, 900)).is_sent());
        }

        let sampled: Vec<u32> = (0..7)
            .map(|_| consumer.process_one())
            .filter(|c| c.latency_us.is_some())
            .map(|c| c.sequence)
            .collect();
        assert_eq!(sampled, vec![6, 11]);
        assert_eq!(consumer.consumed(), 7);
        assert_eq!(stats.snapshot().latency.count, 2);
        assert_eq!(stats.snapshot().latency.last_us, 100);
    }

    #[test]
    fn future_timestamp_reports_zero_latency() {
        let (transport, _stats, mut consumer) = consumer(1, ManualClock::new(50));
        assert!(transport.emit(&stamped(0, 80)).is_sent());
        assert_eq!(consumer.process_one().latency_us, Some(0));
    }

    #[test]
    fn try_process_one_returns_none_when_idle() {
        let (_transport, stats, mut consumer) = consumer(1, ManualClock::new(0));
        assert!(consumer.try_process_one().is_none());
        assert_eq!(stats.snapshot().consumed, 0);
    }

    #[test]
    fn simulated_work_takes_at_least_the_configured_time() {
        let start = Instant::now();
        spin_for(Duration::from_micros(300));
        assert!(start.elapsed() >= Duration::from_micros(300));
    }
}
