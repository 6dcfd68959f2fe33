//! Error types for Palisade
//!
//! The checker's policy table needs to tell apart a response that arrived
//! with an error status (classified by status code and body text) from a
//! call that produced no response at all.

use thiserror::Error;

/// A failed key check.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The provider answered with a non-success status. The body text is
    /// retained verbatim for pattern-based classification.
    #[error("upstream returned HTTP {status}")]
    UpstreamStatus { status: u16, body: String },

    /// The call produced no response (connect failure, timeout, TLS error).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider answered 2xx but the body did not have the expected
    /// shape. Treated like a network error by the failure policy.
    #[error("malformed upstream response: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl CheckError {
    /// Status code of the upstream response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            CheckError::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for key check operations
pub type CheckResult<T> = Result<T, CheckError>;
