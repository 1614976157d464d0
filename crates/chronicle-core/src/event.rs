//! Domain event abstractions.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::stream::StreamId;

/// Metadata attached to every domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata<Id> {
    /// Stream this event belongs to.
    pub stream_id: Id,
    /// Position within the stream, starting at 1.
    pub version: i64,
    /// Timestamp of event creation, millisecond precision.
    pub occurred_on: DateTime<Utc>,
    /// Stable type tag used for decoder lookup.
    pub event_type: String,
}

impl<Id> EventMetadata<Id> {
    /// Creates metadata, truncating `occurred_on` to whole milliseconds so a
    /// storage round trip reproduces it exactly.
    #[must_use]
    pub fn new(
        stream_id: Id,
        version: i64,
        occurred_on: DateTime<Utc>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            stream_id,
            version,
            occurred_on: occurred_on.trunc_subsecs(3),
            event_type: event_type.into(),
        }
    }
}

/// Trait that all domain events implement.
pub trait DomainEvent: Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Identifier type of the stream the event is written to.
    type Id: StreamId;

    /// Returns the event type tag (used for decoder routing).
    fn event_type(&self) -> &'static str;

    /// Serializes the event payload, without metadata, to JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if the payload cannot be
    /// represented as JSON.
    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error>;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata<Self::Id>;
}
