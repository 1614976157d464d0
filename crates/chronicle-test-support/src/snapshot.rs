//! Snapshot stores for tests.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Mutex;

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use chronicle_core::snapshot::{Snapshot, SnapshotStore};
use chronicle_core::stream::StreamId;

/// Keeps the latest snapshot per stream in memory and counts writes.
#[derive(Debug)]
pub struct InMemorySnapshotStore<Id, S> {
    snapshots: Mutex<HashMap<Id, Snapshot<S>>>,
    writes: Mutex<usize>,
}

impl<Id: StreamId, S: Clone + Send + Sync> InMemorySnapshotStore<Id, S> {
    /// Creates an empty snapshot store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshots: Mutex::new(HashMap::new()),
            writes: Mutex::new(0),
        }
    }

    /// Seeds a snapshot directly, bypassing the write count.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert(&self, stream_id: Id, snapshot: Snapshot<S>) {
        self.snapshots.lock().unwrap().insert(stream_id, snapshot);
    }

    /// Returns the stored snapshot for a stream.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn get(&self, stream_id: &Id) -> Option<Snapshot<S>> {
        self.snapshots.lock().unwrap().get(stream_id).cloned()
    }

    /// Returns how many times `store_snapshot` was called.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl<Id: StreamId, S: Clone + Send + Sync> Default for InMemorySnapshotStore<Id, S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<Id: StreamId, S: Clone + Send + Sync> SnapshotStore<Id, S> for InMemorySnapshotStore<Id, S> {
    async fn latest_snapshot(&self, stream_id: &Id) -> Result<Option<Snapshot<S>>, DomainError> {
        let snapshots = self
            .snapshots
            .lock()
            .map_err(|_| DomainError::Infrastructure("snapshot lock poisoned".into()))?;
        Ok(snapshots.get(stream_id).cloned())
    }

    async fn store_snapshot(
        &self,
        stream_id: &Id,
        snapshot: Snapshot<S>,
    ) -> Result<(), DomainError> {
        let mut snapshots = self
            .snapshots
            .lock()
            .map_err(|_| DomainError::Infrastructure("snapshot lock poisoned".into()))?;
        snapshots.insert(stream_id.clone(), snapshot);
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }
}

/// A snapshot store that finds nothing and fails every write.
#[derive(Debug)]
pub struct FailingSnapshotStore<S>(PhantomData<fn() -> S>);

impl<S> FailingSnapshotStore<S> {
    /// Creates a new failing snapshot store.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S> Default for FailingSnapshotStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<Id: StreamId, S: Send + Sync> SnapshotStore<Id, S> for FailingSnapshotStore<S> {
    async fn latest_snapshot(&self, _stream_id: &Id) -> Result<Option<Snapshot<S>>, DomainError> {
        Ok(None)
    }

    async fn store_snapshot(
        &self,
        _stream_id: &Id,
        _snapshot: Snapshot<S>,
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("snapshot storage unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_store_replaces_previous_snapshot() {
        let store = InMemorySnapshotStore::<Uuid, u32>::new();
        let id = Uuid::new_v4();

        store
            .store_snapshot(&id, Snapshot { state: 1, version: 10 })
            .await
            .unwrap();
        store
            .store_snapshot(&id, Snapshot { state: 2, version: 20 })
            .await
            .unwrap();

        let latest = store.latest_snapshot(&id).await.unwrap();
        assert_eq!(latest, Some(Snapshot { state: 2, version: 20 }));
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn test_failing_store_rejects_writes() {
        let store = FailingSnapshotStore::<u32>::new();

        let result = SnapshotStore::<Uuid, u32>::store_snapshot(
            &store,
            &Uuid::new_v4(),
            Snapshot { state: 1, version: 1 },
        )
        .await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
