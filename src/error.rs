//! Error taxonomy for the queue's construction, freeze, and contract checks.
//!
//! The hot path (claim/publish/next) is error-free by construction: it can
//! only stall, and stalls are delegated to the [`crate::wait_strategy::YieldStrategy`].
//! Everything recoverable lives here, and lives at construction, freeze, or
//! teardown.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VarontError>;

/// Everything that can go wrong outside the hot path.
#[derive(Error, Debug)]
pub enum VarontError {
    /// Capacity not representable, zero producers/consumers at freeze, or a
    /// dependency cycle among consumers.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// A cycle was found in the consumer dependency graph at freeze time.
    #[error("dependency cycle detected among consumers")]
    DependencyCycle,

    /// Claim after `eof()`, `next` after EOF, or any other hot-path misuse
    /// that the contract forbids. Debug builds additionally assert.
    #[error("contract violation: {message}")]
    Contract { message: String },

    /// Value, producer, consumer, or queue allocation failed at construction.
    #[error("allocation failed: {message}")]
    Memory { message: String },
}

impl VarontError {
    pub fn config(message: impl Into<String>) -> Self {
        VarontError::Config { message: message.into() }
    }

    pub fn contract(message: impl Into<String>) -> Self {
        VarontError::Contract { message: message.into() }
    }

    pub fn memory(message: impl Into<String>) -> Self {
        VarontError::Memory { message: message.into() }
    }

    /// Whether retrying the same call later could plausibly succeed.
    /// Configuration and contract errors never become valid by waiting;
    /// only memory pressure might (e.g. freed up by other teardown).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, VarontError::Memory { .. })
    }
}

/// Builds a [`VarontError::Config`] with a formatted message, mirroring the
/// call-site ergonomics of the classification-helper functions above.
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::error::VarontError::config(format!($($arg)*))
    };
}

/// Builds a [`VarontError::Contract`] with a formatted message.
#[macro_export]
macro_rules! contract_error {
    ($($arg:tt)*) => {
        $crate::error::VarontError::contract(format!($($arg)*))
    };
}
