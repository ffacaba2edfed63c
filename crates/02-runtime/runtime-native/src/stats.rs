//! Pipeline counters and latency samples.
//!
//! Counters are relaxed atomics so the producer can bump them from its
//! non-blocking context. Latency samples only come from the consumer and sit
//! behind a mutex that snapshot readers briefly share.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use transport::DropReason;

/// Running min/max/mean over sampled latencies, in microseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LatencySummary {
    /// Samples taken.
    pub count: u64,
    /// Smallest sample.
    pub min_us: i64,
    /// Largest sample.
    pub max_us: i64,
    /// Most recent sample.
    pub last_us: i64,
    total_us: i128,
}

impl LatencySummary {
    /// Folds one sample in.
    pub fn record(&mut self, latency_us: i64) {
        if self.count == 0 {
            self.min_us = latency_us;
            self.max_us = latency_us;
        } else {
            self.min_us = self.min_us.min(latency_us);
            self.max_us = self.max_us.max(latency_us);
        }
        self.count += 1;
        self.last_us = latency_us;
        self.total_us += i128::from(latency_us);
    }

    /// Mean sample, if any were taken.
    pub fn mean_us(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total_us as f64 / self.count as f64)
    }
}

/// Shared instrumentation for one pipeline.
#[derive(Debug, Default)]
pub struct PipelineStats {
    sent: AtomicU64,
    dropped_queue_full: AtomicU64,
    dropped_pool_exhausted: AtomicU64,
    corrupted: AtomicU64,
    consumed: AtomicU64,
    ticks_missed: AtomicU64,
    latency: Mutex<LatencySummary>,
}

impl PipelineStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one record accepted by the transport.
    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one dropped record under its reason.
    pub fn record_drop(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::QueueFull => &self.dropped_queue_full,
            DropReason::PoolExhausted => &self.dropped_pool_exhausted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one sentinel mismatch.
    pub fn record_corruption(&self) {
        self.corrupted.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one record the consumer finished with.
    pub fn record_consumed(&self) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds skipped timer periods.
    pub fn record_missed_ticks(&self, missed: u64) {
        self.ticks_missed.fetch_add(missed, Ordering::Relaxed);
    }

    /// Folds a latency sample into the summary.
    pub fn record_latency(&self, latency_us: i64) {
        self.latency.lock().record(latency_us);
    }

    /// Total drops across both reasons.
    pub fn dropped(&self) -> u64 {
        self.dropped_queue_full.load(Ordering::Relaxed)
            + self.dropped_pool_exhausted.load(Ordering::Relaxed)
    }

    /// Copies every counter out at once.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            dropped_queue_full: self.dropped_queue_full.load(Ordering::Relaxed),
            dropped_pool_exhausted: self.dropped_pool_exhausted.load(Ordering::Relaxed),
            corrupted: self.corrupted.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            ticks_missed: self.ticks_missed.load(Ordering::Relaxed),
            latency: *self.latency.lock(),
        }
    }
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Records accepted by the transport.
    pub sent: u64,
    /// Records dropped because the copy channel was full.
    pub dropped_queue_full: u64,
    /// Records dropped because the pool had no free slot.
    pub dropped_pool_exhausted: u64,
    /// Records whose sentinel bytes did not verify.
    pub corrupted: u64,
    /// Records the consumer finished with.
    pub consumed: u64,
    /// Timer periods skipped because the producer fell behind.
    pub ticks_missed: u64,
    /// Sampled producer-to-consumer latency.
    pub latency: LatencySummary,
}

impl StatsSnapshot {
    /// Total drops across both reasons.
    pub fn dropped(&self) -> u64 {
        self.dropped_queue_full + self.dropped_pool_exhausted
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sent={} consumed={} dropped(queue_full={} pool_exhausted={}) corrupted={} ticks_missed={}",
            self.sent,
            self.consumed,
            self.dropped_queue_full,
            self.dropped_pool_exhausted,
            self.corrupted,
            self.ticks_missed,
        )?;
        let latency = &self.latency;
        match latency.mean_us() {
            Some(mean) => write!(
                f,
                " latency_us(samples={} min={} mean={:.1} max={} last={})",
                latency.count, latency.min_us, mean, latency.max_us, latency.last_us
            ),
            None => f.write_str(" latency_us(samples=0)"),
        }
    }
}
