//! Error types for the sync engine.

use chatsync_protocol::{ChatId, EnvelopeError, ProtocolError};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Server answered with `success: false`.
    #[error("server error: {0}")]
    Server(String),

    /// No credential is available from the session.
    #[error("not authenticated")]
    Unauthenticated,

    /// Server refused the credential.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Input rejected before any network call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The chat is not held locally.
    #[error("chat {0} not found")]
    ChatNotFound(ChatId),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Server(_) => true,
            _ => false,
        }
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::MalformedEnvelope(message) => SyncError::Decode(message),
            other => SyncError::Validation(other.to_string()),
        }
    }
}

impl From<EnvelopeError> for SyncError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Rejected(message) => SyncError::Server(message),
            EnvelopeError::Malformed(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection lost").is_retryable());
        assert!(!SyncError::transport_fatal("invalid certificate").is_retryable());
        assert!(SyncError::Server("internal error".into()).is_retryable());
        assert!(!SyncError::Unauthenticated.is_retryable());
        assert!(!SyncError::Validation("empty text".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        assert_eq!(SyncError::Unauthenticated.to_string(), "not authenticated");
        assert_eq!(SyncError::ChatNotFound(7).to_string(), "chat 7 not found");
    }

    #[test]
    fn envelope_errors_convert() {
        let err: SyncError = EnvelopeError::Rejected("nope".into()).into();
        assert!(matches!(err, SyncError::Server(ref m) if m == "nope"));

        let err: SyncError =
            EnvelopeError::Malformed(ProtocolError::MalformedEnvelope("bad".into())).into();
        assert!(matches!(err, SyncError::Decode(_)));

        let err: SyncError = ProtocolError::InvalidPhone("x".into()).into();
        assert!(matches!(err, SyncError::Validation(_)));
    }
}
