use std::io;

use thiserror::Error;
use transport::TransportError;

/// Rejected [`crate::PipelineConfig`] values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Channel capacity or pool size of zero.
    #[error("capacity must be at least 1")]
    ZeroCapacity,
    /// Producer period of zero.
    #[error("tick interval must be non-zero")]
    ZeroTickInterval,
    /// Latency sampling every zero records.
    #[error("sampling interval must be at least 1 record")]
    ZeroSampleInterval,
    /// Both sides pinned to one core, which defeats the cross-core handoff.
    #[error("producer and consumer are both pinned to core {core}")]
    SharedCore {
        /// The doubly assigned core.
        core: usize,
    },
}

/// Failures while bringing a pipeline up.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The configuration did not validate.
    #[error("invalid pipeline config: {0}")]
    Config(#[from] ConfigError),
    /// Ring or pool allocation failed.
    #[error("transport init failed: {0}")]
    Transport(#[from] TransportError),
    /// The OS refused to start a pipeline thread.
    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        /// `"producer"` or `"consumer"`.
        role: &'static str,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
}

/// Result alias for pipeline start-up.
pub type PipelineResult<T, E = PipelineError> = Result<T, E>;
