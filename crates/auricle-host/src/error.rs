//! Host boundary error types.

use thiserror::Error;

/// Host error type.
///
/// Deliberately small: an unavailable platform audio service is reported
/// as an empty device set, not an error, so only subscription plumbing
/// can fail.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Failed to subscribe to platform signals: {0}")]
    SubscribeFailed(String),
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;
