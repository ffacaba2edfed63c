//! Wires a transport, a timer-driven producer and a consumer thread together.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};
use transport::{
    PoolOccupancy, Record, Strategy, StrategyKind, Transport, DEFAULT_PAYLOAD_SIZE,
};

use crate::affinity::pin_or_warn;
use crate::clock::MonotonicClock;
use crate::config::PipelineConfig;
use crate::consumer::Consumer;
use crate::error::{PipelineError, PipelineResult};
use crate::producer::Producer;
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::timer::PeriodicTimer;

/// Name of the producer timer thread.
pub const PRODUCER_THREAD: &str = "ipc-producer";
/// Name of the consumer thread.
pub const CONSUMER_THREAD: &str = "ipc-consumer";

/// A running pipeline.
///
/// Dropping the handle stops the producer. The consumer has no exit path: it
/// stays parked in `receive` once the producer is gone, holding its share of
/// the transport.
pub struct PipelineHandle<const N: usize = DEFAULT_PAYLOAD_SIZE> {
    config: PipelineConfig,
    transport: Arc<Strategy<N>>,
    stats: Arc<PipelineStats>,
    timer: Option<PeriodicTimer>,
    _consumer: JoinHandle<()>,
}

/// Validates `config`, builds the transport and starts both threads.
///
/// Nothing is left running when this fails.
pub fn start<const N: usize>(config: PipelineConfig) -> PipelineResult<PipelineHandle<N>> {
    config.validate()?;
    let transport = Arc::new(Strategy::<N>::init(config.strategy, config.capacity)?);
    let stats = Arc::new(PipelineStats::new());
    let clock = MonotonicClock::new();

    match config.strategy {
        StrategyKind::Copy => warn!(
            capacity = config.capacity,
            record_bytes = std::mem::size_of::<Record<N>>(),
            "copy transport: every record is copied into and out of the channel"
        ),
        StrategyKind::Pool => warn!(
            pool_size = config.capacity,
            handle_bytes = std::mem::size_of::<u32>(),
            "pool transport: records are handed off by slot index"
        ),
    }

    // The timer goes first: if the consumer cannot be spawned, dropping it
    // stops the producer again.
    let timer = {
        let mut producer =
            Producer::<_, _, N>::new(Arc::clone(&transport), Arc::clone(&stats), clock);
        PeriodicTimer::start(
            PRODUCER_THREAD,
            config.tick_interval,
            config.producer_core,
            Arc::clone(&stats),
            move || {
                producer.tick();
            },
        )
        .map_err(|source| PipelineError::Spawn {
            role: "producer",
            source,
        })?
    };

    let consumer = {
        let consumer = Consumer::<_, _, N>::new(
            Arc::clone(&transport),
            Arc::clone(&stats),
            clock,
            config.sample_every,
            config.consumer_work,
        );
        let core = config.consumer_core;
        thread::Builder::new()
            .name(CONSUMER_THREAD.to_owned())
            .spawn(move || {
                pin_or_warn(core, "consumer");
                consumer.run();
            })
            .map_err(|source| PipelineError::Spawn {
                role: "consumer",
                source,
            })?
    };

    warn!(
        strategy = %config.strategy,
        interval_us = config.tick_interval.as_micros() as u64,
        payload_bytes = N,
        "producer timer started"
    );

    Ok(PipelineHandle {
        config,
        transport,
        stats,
        timer: Some(timer),
        _consumer: consumer,
    })
}

impl<const N: usize> PipelineHandle<N> {
    /// Configuration the pipeline was started with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shared counters, readable after the handle is gone.
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// The transport both threads use.
    pub fn transport(&self) -> Arc<Strategy<N>> {
        Arc::clone(&self.transport)
    }

    /// Current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Slot distribution, for the pool strategy.
    pub fn occupancy(&self) -> Option<PoolOccupancy> {
        self.transport.occupancy()
    }

    /// Records emitted but not yet received.
    pub fn pending(&self) -> u32 {
        self.transport.pending()
    }

    /// Stops the producer and returns the counters at that point.
    ///
    /// Records already in flight are still drained by the consumer.
    pub fn stop(mut self) -> StatsSnapshot {
        self.halt();
        self.stats.snapshot()
    }

    fn halt(&mut self) {
        if let Some(timer) = self.timer.take() {
            let ticks = timer.stop();
            info!(ticks, stats = %self.stats.snapshot(), "producer stopped");
        }
    }
}

impl<const N: usize> Drop for PipelineHandle<N> {
    fn drop(&mut self) {
        self.halt();
    }
}
