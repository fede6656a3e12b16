//! Error types for cluster variance analysis

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while analyzing a cluster partition
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Centroid and observation variable sets disagree
    #[error("Schema mismatch: {message}")]
    SchemaMismatch {
        /// Error message
        message: String,
    },

    /// Degenerate or inconsistent partition (k < 2, n <= k, bad labels)
    #[error("Invalid partition: {message}")]
    InvalidPartition {
        /// Error message
        message: String,
    },

    /// Empty or malformed input data
    #[error("Invalid data: {message}")]
    InvalidData {
        /// Error message
        message: String,
    },

    /// Mathematical computation error
    #[error("Computation error: {message}")]
    ComputationError {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a new SchemaMismatch error
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Create a new InvalidPartition error
    pub fn invalid_partition(message: impl Into<String>) -> Self {
        Self::InvalidPartition {
            message: message.into(),
        }
    }

    /// Create a new InvalidData error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new ComputationError
    pub fn computation_error(message: impl Into<String>) -> Self {
        Self::ComputationError {
            message: message.into(),
        }
    }
}
