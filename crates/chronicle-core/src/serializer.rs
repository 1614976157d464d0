//! Event serialization and the type-tag registry.
//!
//! Stored bodies carry the event metadata next to the payload:
//!
//! ```json
//! {"metadata": {"stream_id": "...", "version": 3, ...}, "payload": {...}}
//! ```
//!
//! Decoding is routed by the stable type tag recorded with each stored
//! event, never by a language-level type name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::event::{DomainEvent, EventMetadata};

/// Converts domain events to stored bodies and back.
pub trait EventSerializer<E: DomainEvent>: Send + Sync {
    /// Serializes the whole event, metadata included.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the event cannot be encoded.
    fn serialize(&self, event: &E) -> Result<String, DomainError>;

    /// Rebuilds the event recorded under `event_type`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Deserialization` for unknown tags, malformed
    /// bodies, or bodies whose metadata disagrees with `event_type`.
    fn deserialize(&self, body: &str, event_type: &str) -> Result<E, DomainError>;
}

/// Builds a concrete event from its decoded metadata and raw payload.
pub type EventDecoder<E> = fn(
    EventMetadata<<E as DomainEvent>::Id>,
    serde_json::Value,
) -> Result<E, serde_json::Error>;

#[derive(Serialize)]
struct EncodedEvent<'a, Id> {
    metadata: &'a EventMetadata<Id>,
    payload: serde_json::Value,
}

#[derive(Deserialize)]
struct DecodedEvent<Id> {
    metadata: EventMetadata<Id>,
    payload: serde_json::Value,
}

/// JSON serializer backed by an explicit tag → decoder registry.
#[derive(Debug, Clone)]
pub struct JsonEventSerializer<E: DomainEvent> {
    decoders: HashMap<&'static str, EventDecoder<E>>,
}

impl<E: DomainEvent> JsonEventSerializer<E> {
    /// Creates a serializer with no registered decoders.
    #[must_use]
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registers the decoder for `event_type`, replacing any earlier one.
    #[must_use]
    pub fn register(mut self, event_type: &'static str, decoder: EventDecoder<E>) -> Self {
        self.decoders.insert(event_type, decoder);
        self
    }

    /// Returns whether `event_type` has a decoder.
    #[must_use]
    pub fn is_registered(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }
}

impl<E: DomainEvent> Default for JsonEventSerializer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DomainEvent> EventSerializer<E> for JsonEventSerializer<E> {
    fn serialize(&self, event: &E) -> Result<String, DomainError> {
        let payload = event.to_payload().map_err(|e| {
            DomainError::Serialization(format!("{} payload: {e}", event.event_type()))
        })?;
        serde_json::to_string(&EncodedEvent {
            metadata: event.metadata(),
            payload,
        })
        .map_err(|e| DomainError::Serialization(format!("{}: {e}", event.event_type())))
    }

    fn deserialize(&self, body: &str, event_type: &str) -> Result<E, DomainError> {
        let failed = |message: String| DomainError::Deserialization {
            event_type: event_type.to_owned(),
            message,
        };

        let decoder = self
            .decoders
            .get(event_type)
            .ok_or_else(|| failed("no decoder registered for this event type".to_owned()))?;

        let decoded: DecodedEvent<E::Id> =
            serde_json::from_str(body).map_err(|e| failed(format!("malformed body: {e}")))?;

        if decoded.metadata.event_type != event_type {
            return Err(failed(format!(
                "body was written as {}",
                decoded.metadata.event_type
            )));
        }

        decoder(decoded.metadata, decoded.payload).map_err(|e| failed(format!("bad payload: {e}")))
    }
}
