use std::path::PathBuf;
use std::time::Duration;

use crate::gpu::DeviceError;

/// Error type for a single counting invocation.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CountError {
    /// The corpus file could not be read.
    #[error("cannot read {}", path.display())]
    #[diagnostic(code(wordbench::count::io))]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The target token is empty or contains whitespace.
    #[error("invalid target token {0:?}")]
    #[diagnostic(
        code(wordbench::count::invalid_target),
        help("the target must be a single non-empty word without whitespace")
    )]
    InvalidTarget(String),

    /// Parallel workers did not all finish within the join bound.
    #[error("workers did not finish within {}s", after.as_secs())]
    #[diagnostic(
        code(wordbench::count::timeout),
        help("raise --timeout-secs, or lower --workers if the machine is oversubscribed")
    )]
    Timeout {
        /// The bound that expired.
        after: Duration,
    },

    /// A worker task panicked before reporting its partial count.
    #[error("worker task panicked: {0}")]
    #[diagnostic(code(wordbench::count::worker_panicked))]
    WorkerPanicked(String),

    /// The worker pool could not be started.
    #[error("failed to start worker pool")]
    #[diagnostic(code(wordbench::count::worker_pool))]
    WorkerPool(#[source] std::io::Error),

    /// The compute device pipeline failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Device(#[from] DeviceError),
}
