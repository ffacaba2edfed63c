use std::time::Duration;

use transport::StrategyKind;

use crate::error::ConfigError;

/// Default producer period.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_micros(1_000);

/// Everything fixed when a pipeline starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Transport used for the process lifetime.
    pub strategy: StrategyKind,
    /// Channel depth (copy) or slot count (pool).
    pub capacity: u32,
    /// Producer period.
    pub tick_interval: Duration,
    /// Sample latency on every `sample_every`-th consumed record.
    pub sample_every: u32,
    /// Core the producer timer thread is pinned to.
    pub producer_core: Option<usize>,
    /// Core the consumer thread is pinned to.
    pub consumer_core: Option<usize>,
    /// Busy-wait per consumed record, simulating processing load.
    pub consumer_work: Duration,
}

impl PipelineConfig {
    /// Defaults for `strategy`.
    ///
    /// The copy strategy simulates 100µs of work per record so that channel
    /// saturation shows up at realistic tick rates; the pool strategy
    /// consumes as fast as it can and samples less often.
    pub fn new(strategy: StrategyKind) -> Self {
        let (sample_every, consumer_work) = match strategy {
            StrategyKind::Copy => (1_000, Duration::from_micros(100)),
            StrategyKind::Pool => (10_000, Duration::ZERO),
        };
        Self {
            strategy,
            capacity: strategy.default_capacity(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            sample_every,
            producer_core: None,
            consumer_core: None,
            consumer_work,
        }
    }

    /// Checks the values a transport or timer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.sample_every == 0 {
            return Err(ConfigError::ZeroSampleInterval);
        }
        match (self.producer_core, self.consumer_core) {
            (Some(producer), Some(consumer)) if producer == consumer => {
                Err(ConfigError::SharedCore { core: producer })
            }
            _ => Ok(()),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(StrategyKind::Pool)
    }
}
