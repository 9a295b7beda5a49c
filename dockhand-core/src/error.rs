//! Error types for the distributor
//!
//! Covers storage, probing, rebalancing, and startup failures.

use thiserror::Error;

/// Primary error type for all distributor operations
#[derive(Debug, Error)]
pub enum DistributorError {
    // ========== Storage Errors ==========

    /// Store operation failed
    #[error("storage operation failed: {message}")]
    Storage { message: String },

    // ========== Probe Errors ==========

    /// Probe client could not be built or connected
    #[error("connection to {endpoint} failed: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// Worker did not answer the liveness probe
    #[error("probe to {endpoint} failed: {reason}")]
    ProbeFailed { endpoint: String, reason: String },

    // ========== Rebalance Preconditions ==========

    /// No work units registered in the store
    #[error("no work units found in storage")]
    NoWorkUnits,

    /// No live workers registered in the store
    #[error("no live workers to distribute to")]
    NoLiveWorkers,

    // ========== Startup Errors ==========

    /// Configuration rejected before the loop started
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DistributorError {
    /// Returns true if the operation is worth retrying on a later tick
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DistributorError::Storage { .. }
                | DistributorError::ConnectionFailed { .. }
                | DistributorError::ProbeFailed { .. }
        )
    }

    /// Returns true for rebalance preconditions that leave the matching
    /// table untouched instead of failing the tick
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            DistributorError::NoWorkUnits | DistributorError::NoLiveWorkers
        )
    }
}

/// Result type alias for distributor operations
pub type Result<T> = std::result::Result<T, DistributorError>;
