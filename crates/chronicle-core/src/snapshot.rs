//! Snapshot interface.
//!
//! Snapshots are an optional optimization: when one exists, an aggregate is
//! rebuilt from the captured state plus the events recorded after it.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::stream::StreamId;

/// Captured aggregate state at a given stream version.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<S> {
    /// State after applying every event up to `version`.
    pub state: S,
    /// Version of the last event folded into `state`.
    pub version: i64,
}

/// Persistence for snapshots of one state type.
#[async_trait]
pub trait SnapshotStore<Id: StreamId, S>: Send + Sync {
    /// Returns the latest snapshot for a stream, or `None` if there is none.
    async fn latest_snapshot(&self, stream_id: &Id) -> Result<Option<Snapshot<S>>, DomainError>;

    /// Stores a snapshot, replacing any existing one for the stream.
    async fn store_snapshot(&self, stream_id: &Id, snapshot: Snapshot<S>)
    -> Result<(), DomainError>;
}

/// When the aggregate context captures snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotPolicy {
    /// Never take snapshots.
    #[default]
    Never,
    /// Take a snapshot whenever a commit crosses a multiple of this many
    /// versions.
    Every(u32),
}

impl SnapshotPolicy {
    /// Returns whether a commit moving the stream from `previous_version` to
    /// `new_version` should be followed by a snapshot.
    #[must_use]
    pub fn should_snapshot(self, previous_version: i64, new_version: i64) -> bool {
        match self {
            Self::Never | Self::Every(0) => false,
            Self::Every(interval) => {
                let interval = i64::from(interval);
                new_version / interval > previous_version / interval
            }
        }
    }
}
