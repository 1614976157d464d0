//! Event store: maps domain events onto the storage gateway and enforces
//! optimistic concurrency.

use std::fmt;
use std::sync::Arc;

use crate::batch::BatchIdProvider;
use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::repository::{
    EventRepository, StoredEvent, ensure_events, ensure_stream_name, ensure_version_range,
};
use crate::serializer::EventSerializer;
use crate::stream::ensure_stream_id;

/// Event store for one domain event type.
///
/// Holds no mutable state of its own; the gateway, serializer and batch-id
/// provider are shared and must be safe for concurrent use.
pub struct EventStore<E: DomainEvent> {
    repository: Arc<dyn EventRepository<Id = E::Id>>,
    serializer: Arc<dyn EventSerializer<E>>,
    batch_ids: Arc<dyn BatchIdProvider>,
}

impl<E: DomainEvent> EventStore<E> {
    /// Creates a new `EventStore`.
    #[must_use]
    pub fn new(
        repository: Arc<dyn EventRepository<Id = E::Id>>,
        serializer: Arc<dyn EventSerializer<E>>,
        batch_ids: Arc<dyn BatchIdProvider>,
    ) -> Self {
        Self {
            repository,
            serializer,
            batch_ids,
        }
    }

    /// Creates the stream for a new aggregate.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank id or type tag,
    /// `DomainError::DuplicateStream` if the stream exists, and any gateway
    /// error unchanged.
    #[tracing::instrument(skip_all, fields(stream_id = %stream_id, aggregate_type = %aggregate_type))]
    pub async fn create_event_stream(
        &self,
        stream_id: &E::Id,
        aggregate_type: &str,
    ) -> Result<(), DomainError> {
        ensure_stream_id(stream_id)?;
        ensure_stream_name(aggregate_type)?;

        if self.repository.check_stream(stream_id).await? {
            return Err(DomainError::DuplicateStream(stream_id.to_string()));
        }

        tracing::debug!("stream does not exist yet, creating it");
        self.repository
            .create_stream(stream_id, aggregate_type)
            .await?;
        tracing::debug!("event stream created");
        Ok(())
    }

    /// Appends `events` to a stream whose durable version the caller last
    /// saw as `expected_current_version`.
    ///
    /// Each event is written with the version carried in its own metadata.
    /// All events of one call share a freshly generated batch id. Returns the
    /// records handed to the gateway.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank id, an empty batch, or a
    /// batch that is foreign to the stream or not consecutive;
    /// `DomainError::ConcurrencyConflict` if the stream moved past
    /// `expected_current_version`; serializer and gateway errors unchanged.
    /// Nothing is written on failure.
    #[tracing::instrument(
        skip_all,
        fields(stream_id = %stream_id, expected_current_version = expected_current_version, events_len = events.len())
    )]
    pub async fn store_events(
        &self,
        stream_id: &E::Id,
        expected_current_version: i64,
        events: &[E],
    ) -> Result<Vec<StoredEvent>, DomainError> {
        ensure_stream_id(stream_id)?;
        ensure_events(events)?;
        ensure_batch_belongs_to(stream_id, events)?;

        let last = self.repository.get_last(stream_id).await?;
        let actual = last.as_ref().map_or(0, |event| event.version);
        tracing::debug!(stored_version = actual, "comparing versions");

        if expected_current_version < actual {
            return Err(DomainError::ConcurrencyConflict {
                stream_id: stream_id.to_string(),
                expected: expected_current_version,
                actual,
            });
        }
        let first_version = events[0].metadata().version;
        if first_version != actual + 1 {
            return Err(DomainError::validation(
                "events",
                format!("batch starts at version {first_version} but stream {stream_id} is at {actual}"),
            ));
        }

        let batch_id = self.batch_ids.next_batch_id();
        tracing::debug!(%batch_id, "serializing events");
        let stored = events
            .iter()
            .map(|event| {
                let metadata = event.metadata();
                Ok(StoredEvent {
                    event_type: event.event_type().to_owned(),
                    occurred_on: metadata.occurred_on,
                    event_body: self.serializer.serialize(event)?,
                    batch_id,
                    version: metadata.version,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        tracing::debug!("sending events to the gateway");
        self.repository.add(stream_id, &stored).await?;
        tracing::debug!("all events stored");
        Ok(stored)
    }

    /// Loads and decodes a whole stream.
    ///
    /// Returns `None` when the stream does not exist and an empty list when
    /// it exists without events.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Deserialization` for the first record that
    /// cannot be decoded, and any gateway error unchanged.
    #[tracing::instrument(skip_all, fields(stream_id = %stream_id))]
    pub async fn load_all_events(&self, stream_id: &E::Id) -> Result<Option<Vec<E>>, DomainError> {
        ensure_stream_id(stream_id)?;
        if !self.repository.check_stream(stream_id).await? {
            tracing::debug!("stream does not exist");
            return Ok(None);
        }

        let stored = self.repository.get_all(stream_id).await?;
        tracing::debug!(stored_events = stored.len(), "decoding stored events");
        self.decode_all(stream_id, &stored).map(Some)
    }

    /// Loads and decodes the events with versions in
    /// `from_version..=to_version` (`None` = to the end of the stream).
    ///
    /// # Errors
    ///
    /// Same as [`load_all_events`](Self::load_all_events), plus
    /// `DomainError::Validation` for an empty version window.
    #[tracing::instrument(skip_all, fields(stream_id = %stream_id, from_version = from_version, to_version = ?to_version))]
    pub async fn load_selected_events(
        &self,
        stream_id: &E::Id,
        from_version: i64,
        to_version: Option<i64>,
    ) -> Result<Option<Vec<E>>, DomainError> {
        ensure_stream_id(stream_id)?;
        ensure_version_range(from_version, to_version)?;
        if !self.repository.check_stream(stream_id).await? {
            tracing::debug!("stream does not exist");
            return Ok(None);
        }

        let stored = self
            .repository
            .get_selected(stream_id, from_version, to_version)
            .await?;
        tracing::debug!(stored_events = stored.len(), "decoding slice of stored events");
        self.decode_all(stream_id, &stored).map(Some)
    }

    fn decode_all(&self, stream_id: &E::Id, stored: &[StoredEvent]) -> Result<Vec<E>, DomainError> {
        stored
            .iter()
            .map(|record| {
                let event = self
                    .serializer
                    .deserialize(&record.event_body, &record.event_type)?;
                let metadata = event.metadata();
                if metadata.version != record.version || &metadata.stream_id != stream_id {
                    return Err(DomainError::Deserialization {
                        event_type: record.event_type.clone(),
                        message: format!(
                            "body of stream {stream_id} version {} decoded as stream {} version {}",
                            record.version, metadata.stream_id, metadata.version
                        ),
                    });
                }
                Ok(event)
            })
            .collect()
    }
}

impl<E: DomainEvent> Clone for EventStore<E> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            serializer: Arc::clone(&self.serializer),
            batch_ids: Arc::clone(&self.batch_ids),
        }
    }
}

impl<E: DomainEvent> fmt::Debug for EventStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStore").finish_non_exhaustive()
    }
}

/// Rejects batches that name another stream or skip versions.
fn ensure_batch_belongs_to<E: DomainEvent>(stream_id: &E::Id, events: &[E]) -> Result<(), DomainError> {
    if let Some(foreign) = events
        .iter()
        .map(DomainEvent::metadata)
        .find(|metadata| &metadata.stream_id != stream_id)
    {
        return Err(DomainError::validation(
            "events",
            format!(
                "event version {} belongs to stream {}, not {stream_id}",
                foreign.version, foreign.stream_id
            ),
        ));
    }
    for pair in events.windows(2) {
        let (previous, next) = (pair[0].metadata().version, pair[1].metadata().version);
        if next != previous + 1 {
            return Err(DomainError::validation(
                "events",
                format!("version {next} follows {previous}"),
            ));
        }
    }
    Ok(())
}
