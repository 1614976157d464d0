//! Shared test doubles and in-memory storage for Chronicle.

mod batch;
mod clock;
mod repository;
mod snapshot;

pub use batch::{FixedBatchId, SequenceBatchIds};
pub use clock::{FixedClock, fixed_now};
pub use repository::{FailingEventRepository, InMemoryEventRepository, RecordingEventRepository};
pub use snapshot::{FailingSnapshotStore, InMemorySnapshotStore};
