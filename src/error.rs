use thiserror::Error;

/// Boxed error type accepted from the caller-supplied transform.
pub type TransformError = Box<dyn std::error::Error + Send + Sync>;

/// Rejected configuration, reported at spawn time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The concurrency limit must allow at least one in-flight transformation.
    #[error("concurrency limit must be at least 1, got {0}")]
    InvalidConcurrencyLimit(usize),
}

/// Terminal stage failures and producer contract violations.
///
/// A `Transform` error aborts the whole stage: no further items are admitted,
/// in-flight work is awaited (its output discarded), and the first error is
/// surfaced through the stage's join handle.
#[derive(Debug, Error)]
pub enum StageError {
    /// The transform rejected an item. Fail-fast, no retry.
    #[error("transform failed for item {index}")]
    Transform {
        /// Sequence index of the item whose transform failed
        index: u64,
        #[source]
        source: TransformError,
    },

    /// `submit` was called after end-of-input was signaled.
    #[error("submit called after end of input was signaled")]
    SubmitAfterClose,

    /// `close` was called twice.
    #[error("end of input signaled twice")]
    CloseAfterClose,

    /// The stage terminated (failed or was cancelled) before the operation
    /// could be delivered or acknowledged.
    #[error("stage terminated before the operation completed")]
    Terminated,
}
