//! Storage gateway abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::stream::StreamId;

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    /// Event type tag for decoder routing.
    pub event_type: String,
    /// Timestamp of event creation.
    pub occurred_on: DateTime<Utc>,
    /// Serialized event (metadata and payload).
    pub event_body: String,
    /// Correlation id shared by every event written in the same commit.
    pub batch_id: Uuid,
    /// Position within the stream, starting at 1.
    pub version: i64,
}

/// Gateway over the physical event storage.
///
/// Implementations are the only authority for stream-identity uniqueness
/// and physical ordering. Every operation validates its arguments before
/// performing any I/O.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Identifier type of the streams held by this gateway.
    type Id: StreamId;

    /// Creates an empty stream.
    ///
    /// Fails with `DuplicateStream` when the identifier is already taken;
    /// that check is left to the storage uniqueness constraint.
    async fn create_stream(&self, stream_id: &Self::Id, stream_name: &str)
    -> Result<(), DomainError>;

    /// Returns whether a stream with this identifier exists.
    async fn check_stream(&self, stream_id: &Self::Id) -> Result<bool, DomainError>;

    /// Loads every event of a stream in ascending version order. Unknown
    /// streams yield an empty list.
    async fn get_all(&self, stream_id: &Self::Id) -> Result<Vec<StoredEvent>, DomainError>;

    /// Loads the event with the highest version, if any.
    async fn get_last(&self, stream_id: &Self::Id) -> Result<Option<StoredEvent>, DomainError>;

    /// Loads the events with `from_version <= version <= to_version`, in
    /// ascending order. `None` leaves the upper bound open.
    async fn get_selected(
        &self,
        stream_id: &Self::Id,
        from_version: i64,
        to_version: Option<i64>,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Appends `events` as one all-or-nothing unit, preserving their order.
    ///
    /// Fails with `StreamNotFound` for unknown streams and with
    /// `ConcurrencyConflict` when one of the versions is already taken.
    async fn add(&self, stream_id: &Self::Id, events: &[StoredEvent]) -> Result<(), DomainError>;
}

/// Rejects null-equivalent stream names.
///
/// # Errors
///
/// Returns `DomainError::Validation` naming `streamName`.
pub fn ensure_stream_name(stream_name: &str) -> Result<(), DomainError> {
    if stream_name.trim().is_empty() {
        return Err(DomainError::validation(
            "streamName",
            "stream name must not be empty or whitespace",
        ));
    }
    Ok(())
}

/// Rejects empty event batches.
///
/// # Errors
///
/// Returns `DomainError::Validation` naming `events`.
pub fn ensure_events<T>(events: &[T]) -> Result<(), DomainError> {
    if events.is_empty() {
        return Err(DomainError::validation(
            "events",
            "at least one event is required",
        ));
    }
    Ok(())
}

/// Rejects version windows that can never contain an event.
///
/// # Errors
///
/// Returns `DomainError::Validation` naming `fromVersion` or `toVersion`.
pub fn ensure_version_range(from_version: i64, to_version: Option<i64>) -> Result<(), DomainError> {
    if from_version < 1 {
        return Err(DomainError::validation(
            "fromVersion",
            format!("versions start at 1, got {from_version}"),
        ));
    }
    match to_version {
        Some(to) if to < from_version => Err(DomainError::validation(
            "toVersion",
            format!("upper bound {to} is below lower bound {from_version}"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_stream_name_rejects_whitespace() {
        for name in ["", "    ", "\t\n"] {
            match ensure_stream_name(name) {
                Err(DomainError::Validation { field, .. }) => assert_eq!(field, "streamName"),
                other => panic!("expected Validation for {name:?}, got {other:?}"),
            }
        }
        assert!(ensure_stream_name("ordering.order").is_ok());
    }

    #[test]
    fn test_ensure_events_rejects_empty_batch() {
        let result = ensure_events::<StoredEvent>(&[]);

        match result {
            Err(DomainError::Validation { field, .. }) => assert_eq!(field, "events"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_ensure_version_range_bounds() {
        assert!(ensure_version_range(1, None).is_ok());
        assert!(ensure_version_range(3, Some(3)).is_ok());
        assert!(matches!(
            ensure_version_range(0, None),
            Err(DomainError::Validation { field: "fromVersion", .. })
        ));
        assert!(matches!(
            ensure_version_range(5, Some(4)),
            Err(DomainError::Validation { field: "toVersion", .. })
        ));
    }
}
