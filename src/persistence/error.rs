//! This module contains the error types for the persistence layer.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in the persistence layer.
///
/// Every variant means the store could not be relied on for the current
/// invocation; callers abort and let the next trigger retry.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The store could not be reached.
    #[error("The store is unavailable: {0}")]
    Unavailable(String),

    /// A store call did not complete within the client-side timeout.
    #[error("The store did not respond within {0:?}")]
    Timeout(Duration),

    /// The store rejected or failed the operation.
    #[error("A store operation failed: {0}")]
    OperationFailed(String),
}
