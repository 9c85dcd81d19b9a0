//! Error types for filter evaluation.

use std::time::Duration;
use thiserror::Error;

/// A filter could not complete its check. Never fatal: the engine fails open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Lookup of {what} failed: {reason}")]
    LookupFailed { what: String, reason: String },

    #[error("Lookup of {what} timed out after {after:?}")]
    LookupTimeout { what: String, after: Duration },

    #[error("Malformed {object_kind} object: {reason}")]
    MalformedObject { object_kind: String, reason: String },
}
