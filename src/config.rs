use crate::error::ConfigError;

/// Default number of in-flight transformations when none is configured.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 8;

/// Controls the concurrency and emission discipline of a stage.
///
/// Example:
///
/// ```rust
/// use weir::StageConfig;
///
/// // up to 10 in-flight transformations, results emitted in admission order
/// let config = StageConfig::ordered(10);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StageConfig {
    /// How many transformations may be in flight at once. Must be at least 1.
    pub concurrency_limit: usize,
    /// Whether results are emitted in admission order (`true`) or in
    /// completion order (`false`).
    pub ordered: bool,
}

impl StageConfig {
    /// Emit results in admission order, with up to `concurrency_limit`
    /// transformations in flight.
    pub fn ordered(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit,
            ordered: true,
        }
    }

    /// Emit each result as soon as its transformation completes, with up to
    /// `concurrency_limit` transformations in flight.
    pub fn unordered(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit,
            ordered: false,
        }
    }

    /// One transformation at a time. Ordered and unordered emission are
    /// indistinguishable at this limit.
    pub fn serial() -> Self {
        Self {
            concurrency_limit: 1,
            ordered: true,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency_limit < 1 {
            return Err(ConfigError::InvalidConcurrencyLimit(self.concurrency_limit));
        }

        Ok(())
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self::ordered(DEFAULT_CONCURRENCY_LIMIT)
    }
}
