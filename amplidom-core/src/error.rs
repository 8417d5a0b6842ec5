//! Error types for the domain association core.
//!
//! Every operation family has its own enum so callers can match on the
//! outcome they care about. Absence is never folded into a transport error.

use thiserror::Error;

use crate::id::ExternalId;

/// Errors reported by an [`AmplifyClient`](crate::clients::AmplifyClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The object (or its parent app) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was rejected as invalid.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The caller is being throttled.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// The request never produced an answer (connection, timeout, 5xx).
    #[error("transport: {0}")]
    Transport(String),

    /// The service answered with something we cannot use.
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// Whether this error is the service's "no such object" signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Errors decoding a persisted identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed identifier {id:?}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("identifier {id:?} has an empty {component}")]
    EmptyComponent { id: String, component: &'static str },
}

/// Errors creating a domain association.
#[derive(Debug, Error)]
pub enum CreateError {
    /// The declared spec or the service rejected the request.
    #[error("validation: {0}")]
    Validation(String),

    #[error("create failed: {0}")]
    Transport(#[source] ApiError),

    /// The object exists but its verification ended in `FAILED`.
    #[error("domain association {id} failed verification: {reason}")]
    VerificationFailed { id: ExternalId, reason: String },

    /// The object exists but waiting on it did not finish.
    #[error("waiting for domain association {id}: {source}")]
    Wait {
        id: ExternalId,
        #[source]
        source: WaitError,
    },
}

/// Errors reading a domain association.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("invalid id: {0}")]
    InvalidId(#[from] DecodeError),

    /// The object was deleted out of band.
    #[error("domain association {0} is gone")]
    Gone(ExternalId),

    #[error("read failed: {0}")]
    Transport(#[source] ApiError),
}

/// Errors deleting a domain association.
#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("invalid id: {0}")]
    InvalidId(#[from] DecodeError),

    #[error("delete failed: {0}")]
    Transport(#[source] ApiError),
}

/// Errors waiting on asynchronous verification.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("timed out after {elapsed_ms}ms ({attempts} polls)")]
    Timeout { elapsed_ms: u64, attempts: u32 },

    /// The object stopped being visible after the grace period.
    #[error("domain association {0} disappeared")]
    Disappeared(String),

    /// The object was never observed before the grace period ran out.
    #[error("domain association {0} not visible after grace period")]
    NotVisible(String),

    #[error("poll failed: {0}")]
    Transport(#[source] ApiError),
}

/// Failures of the conformance checks.
#[derive(Debug, Error)]
pub enum ConformanceError {
    #[error("no domain association id is set")]
    MissingId,

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("lookup failed: {0}")]
    Lookup(#[source] ApiError),

    #[error("domain association {id} still exists")]
    StillExists { id: String },

    #[error("attribute {attribute}: expected {expected:?}, got {actual:?}")]
    AttributeMismatch {
        attribute: &'static str,
        expected: String,
        actual: String,
    },
}
