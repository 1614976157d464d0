//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An argument was rejected before any I/O took place.
    #[error("validation error on {field}: {message}")]
    Validation {
        /// Name of the offending argument (e.g. `streamId`, `events`).
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// A stream with the same identifier already exists.
    #[error("stream already exists: {0}")]
    DuplicateStream(String),

    /// The addressed stream does not exist.
    #[error("stream not found: {0}")]
    StreamNotFound(String),

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on stream {stream_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The stream that had the conflict.
        stream_id: String,
        /// The version the caller based its changes on.
        expected: i64,
        /// The durable version found in storage.
        actual: i64,
    },

    /// An event could not be encoded for storage.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored record could not be turned back into its declared event type.
    #[error("deserialization error for event type {event_type}: {message}")]
    Deserialization {
        /// The stored type tag.
        event_type: String,
        /// Decoder failure details.
        message: String,
    },

    /// Replaying history onto an aggregate failed.
    #[error("cannot reconstruct stream {stream_id}: {message}")]
    Reconstruction {
        /// The stream being replayed.
        stream_id: String,
        /// Why reconstruction stopped.
        message: String,
    },

    /// A business rule rejected the requested operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Shorthand for building a [`DomainError::Validation`].
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Returns `true` for errors a caller may resolve by reloading the
    /// aggregate and reapplying its command.
    #[must_use]
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}
