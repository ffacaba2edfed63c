#![deny(missing_docs)]
//! Native runtime for the record pipeline: a timer-driven producer and a
//! pinned consumer thread around one [`transport::Strategy`].

mod affinity;
mod clock;
mod config;
mod consumer;
mod error;
mod pipeline;
mod producer;
mod stats;
mod timer;

pub use affinity::{available_cores, pin_current_thread};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{PipelineConfig, DEFAULT_TICK_INTERVAL};
pub use consumer::{Consumed, Consumer};
pub use error::{ConfigError, PipelineError, PipelineResult};
pub use pipeline::{start, PipelineHandle, CONSUMER_THREAD, PRODUCER_THREAD};
pub use producer::Producer;
pub use stats::{LatencySummary, PipelineStats, StatsSnapshot};
pub use timer::PeriodicTimer;
