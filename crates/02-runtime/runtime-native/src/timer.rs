//! Periodic callback thread standing in for a hardware timer interrupt.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::affinity::pin_or_warn;
use crate::stats::PipelineStats;

/// Fires a callback on a fixed period until stopped.
///
/// Deadlines are absolute, so a slow callback does not shift later ticks.
/// When the thread wakes past one or more whole periods, the periods already
/// gone by are skipped and counted in [`PipelineStats`] rather than replayed
/// in a burst.
pub struct PeriodicTimer {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
}

impl PeriodicTimer {
    /// Spawns the timer thread.
    ///
    /// The first tick fires one `interval` after start. `core` pins the
    /// thread when set.
    pub fn start<F>(
        name: &str,
        interval: Duration,
        core: Option<usize>,
        stats: Arc<PipelineStats>,
        mut on_tick: F,
    ) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        if interval.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "timer interval must be non-zero",
            ));
        }
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = Arc::clone(&stop);
            thread::Builder::new().name(name.to_owned()).spawn(move || {
                pin_or_warn(core, "producer");
                run_ticks(interval, &stop, &stats, &mut on_tick)
            })?
        };
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stops the thread and returns how many ticks fired.
    pub fn stop(mut self) -> u64 {
        self.halt()
    }

    fn halt(&mut self) -> u64 {
        self.stop.store(true, Ordering::Release);
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload)),
            None => 0,
        }
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        if self.handle.is_some() && !thread::panicking() {
            self.halt();
        }
    }
}

fn run_ticks(
    interval: Duration,
    stop: &AtomicBool,
    stats: &PipelineStats,
    on_tick: &mut dyn FnMut(),
) -> u64 {
    let mut fired = 0u64;
    let mut deadline = Instant::now() + interval;
    while !stop.load(Ordering::Acquire) {
        let now = Instant::now();
        if now < deadline {
            thread::sleep(deadline - now);
            continue;
        }

        let behind = (now - deadline).as_nanos() / interval.as_nanos();
        if behind > 0 {
            let skipped = u32::try_from(behind).unwrap_or(u32::MAX);
            stats.record_missed_ticks(u64::from(skipped));
            deadline += interval.saturating_mul(skipped);
        }

        on_tick();
        fired += 1;
        deadline += interval;
    }
    fired
}
