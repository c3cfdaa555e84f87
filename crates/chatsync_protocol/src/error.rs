//! Error types for protocol-level parsing and validation.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while parsing or validating protocol values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A status string did not match any known chat status.
    #[error("unknown chat status: {0}")]
    UnknownStatus(String),

    /// A phone number had no digits left after normalization.
    #[error("invalid phone number: {0:?}")]
    InvalidPhone(String),

    /// The server returned an envelope that could not be interpreted.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}
