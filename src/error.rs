//! Error types for reslock.
//!
//! Uses thiserror for derive macros. The taxonomy separates "this will never
//! work" (no matching catalog entry) from "try again later" (busy past the
//! deadline) so callers can branch on the failure class. Expected busy/free
//! outcomes inside the store are plain values, not errors; only real
//! filesystem failures surface as `Store`.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for reslock operations.
///
/// Each variant maps to a distinct process exit code for the operator CLI.
#[derive(Error, Debug)]
pub enum ReslockError {
    /// The catalog has no descriptor matching the requested kind/constraints.
    /// This is a configuration problem and is never retried.
    #[error("no matching resource definition: {0}")]
    NoMatchingResource(String),

    /// Matching descriptors exist but none could be claimed before the
    /// global deadline. The caller may retry with a fresh deadline.
    #[error("timed out waiting for resource: {0}")]
    BusyTimeout(String),

    /// The shared lock-store filesystem failed. Surfaced as-is; no local
    /// recovery is safe at this layer.
    #[error("lock store failure: {0}")]
    Store(String),

    /// Invalid arguments or invalid on-disk state reported to the operator.
    #[error("{0}")]
    UserError(String),
}

impl ReslockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReslockError::NoMatchingResource(_) => exit_codes::NO_MATCHING_RESOURCE,
            ReslockError::BusyTimeout(_) => exit_codes::BUSY_TIMEOUT,
            ReslockError::Store(_) => exit_codes::STORE_FAILURE,
            ReslockError::UserError(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for reslock operations.
pub type Result<T> = std::result::Result<T, ReslockError>;
