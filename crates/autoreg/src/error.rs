//! Error types for the handler's internal steps.
//!
//! None of these reach the order pipeline: the handler logs them and the
//! order completes regardless.

use thiserror::Error;

use crate::platform::PlatformError;

/// Errors raised while linking a new account to its order and customer.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A platform service failed.
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    /// A meta value could not be encoded.
    #[error("meta encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}
