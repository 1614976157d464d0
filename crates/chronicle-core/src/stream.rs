//! Stream identity.

use std::fmt;
use std::hash::Hash;

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a single event stream.
///
/// Every identifier type has exactly one "blank" value that never names a
/// stream; gateways reject it before touching storage.
pub trait StreamId:
    Clone + Eq + Hash + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Returns `true` for the value that can never identify a stream.
    fn is_blank(&self) -> bool;
}

impl StreamId for Uuid {
    fn is_blank(&self) -> bool {
        self.is_nil()
    }
}

impl StreamId for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

/// Logical stream row: identifier plus the aggregate type tag it was
/// created for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventStream<Id> {
    /// Stream identifier.
    pub stream_id: Id,
    /// Aggregate type tag recorded at creation.
    pub stream_name: String,
}

/// Rejects the blank identifier.
///
/// # Errors
///
/// Returns `DomainError::Validation` naming `streamId`.
pub fn ensure_stream_id<Id: StreamId>(stream_id: &Id) -> Result<(), DomainError> {
    if stream_id.is_blank() {
        return Err(DomainError::validation(
            "streamId",
            "stream identifier must not be empty",
        ));
    }
    Ok(())
}
