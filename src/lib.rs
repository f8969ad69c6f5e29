//! A bounded-concurrency async transform stage. A weir lets a stream through,
//! but decides how much water passes at once.
//!
//! A stage consumes a sequential stream of items, applies a caller-supplied
//! async transformation to each, and re-emits results downstream while:
//!
//! - never running more than a configured number of transformations at once
//! - emitting either unordered (as completions happen) or ordered (in strict
//!   admission order)
//! - acknowledging a submission only once the item is granted an execution
//!   slot, which is what backpressures the producer
//! - signaling completion only after end-of-input *and* all in-flight work
//!   has drained
//!
//! Built on Tokio tasks and channels; for now only the Tokio runtime is
//! supported.
//!
//! Example:
//!
//! ```rust
//! use weir::StageConfig;
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! # async fn fetch_status(url: String) -> Result<Option<String>, std::io::Error> { Ok(Some(url)) }
//! let (mut handle, mut outputs, done) = StageConfig::unordered(5)
//!     .spawn(fetch_status)
//!     .unwrap();
//!
//! // resolves per item once it is dispatched, then signals end of input
//! handle.submit_all(vec!["https://example.com".to_string()]).await.unwrap();
//!
//! while let Some(line) = outputs.recv().await {
//!     println!("{line}");
//! }
//!
//! // Ok(()) once fully drained; Err carries the first transform failure
//! done.await.unwrap().unwrap();
//! # });
//! ```
//!
//! ## How it works
//!
//! Each spawned stage is a single Tokio task owning all of its state, driving
//! a `select!` loop over two channels:
//!
//! - the command channel carries submissions and the end-of-input signal. A
//!   submission is queued with a monotonically increasing sequence index and
//!   its acknowledgment is deferred until the scheduler dispatches it into a
//!   free execution slot.
//! - completed transformations are drained from a `FuturesUnordered` of
//!   in-flight work, handed to the emission policy, and the freed slot is
//!   refilled from the pending queue.
//!
//! The ordered emission policy buffers completed results keyed by sequence
//! index and releases the contiguous prefix starting at the next expected
//! index; the unordered policy releases immediately. A transform returning
//! `Ok(None)` emits nothing but still occupies its place in the order.
//!
//! ## Failure
//!
//! The first transform error aborts the stage: queued items are rejected,
//! remaining in-flight work is awaited (its output discarded), and the error
//! is surfaced through the join handle. There is no internal retry,
//! cancellation, or timeout - a transform that needs a deadline should
//! enforce one itself.

mod config;
mod emission;
mod error;
mod ledger;
mod stage;

#[cfg(test)]
mod test_utils;

pub use config::{StageConfig, DEFAULT_CONCURRENCY_LIMIT};
pub use error::{ConfigError, StageError, TransformError};
pub use stage::StageHandle;
