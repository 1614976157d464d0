//! Aggregate context: load, create and save aggregates of one type.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::aggregate::{Aggregate, AggregateRoot, AggregateState, StreamIdOf};
use crate::error::DomainError;
use crate::hydrator;
use crate::repository::StoredEvent;
use crate::snapshot::{Snapshot, SnapshotPolicy, SnapshotStore};
use crate::store::EventStore;

/// Event type of an aggregate.
pub type EventOf<A> = <<A as Aggregate>::State as AggregateState>::Event;

/// Stream identifier type of an aggregate.
pub type IdOf<A> = StreamIdOf<<A as Aggregate>::State>;

/// Loads, creates and saves aggregates of type `A` through an
/// [`EventStore`], optionally short-cutting replay with snapshots.
pub struct AggregateContext<A: Aggregate> {
    store: EventStore<EventOf<A>>,
    snapshots: Option<Arc<dyn SnapshotStore<IdOf<A>, A::State>>>,
    policy: SnapshotPolicy,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A: Aggregate> AggregateContext<A> {
    /// Creates a context that always replays full streams.
    #[must_use]
    pub fn new(store: EventStore<EventOf<A>>) -> Self {
        Self {
            store,
            snapshots: None,
            policy: SnapshotPolicy::Never,
            _aggregate: PhantomData,
        }
    }

    /// Reads snapshots from `snapshots` when loading and writes them
    /// according to `policy` when saving.
    #[must_use]
    pub fn with_snapshots(
        mut self,
        snapshots: Arc<dyn SnapshotStore<IdOf<A>, A::State>>,
        policy: SnapshotPolicy,
    ) -> Self {
        self.snapshots = Some(snapshots);
        self.policy = policy;
        self
    }

    /// Returns the underlying event store.
    pub fn store(&self) -> &EventStore<EventOf<A>> {
        &self.store
    }

    /// Rebuilds the aggregate, or returns `None` if its stream does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Propagates snapshot, store and reconstruction errors.
    #[tracing::instrument(skip_all, fields(stream_id = %id))]
    pub async fn try_load(&self, id: &IdOf<A>) -> Result<Option<A>, DomainError> {
        let snapshot = match &self.snapshots {
            Some(snapshots) => snapshots.latest_snapshot(id).await?,
            None => None,
        };

        let root = if let Some(snapshot) = snapshot {
            tracing::debug!(snapshot_version = snapshot.version, "loading events after snapshot");
            let Some(tail) = self
                .store
                .load_selected_events(id, snapshot.version + 1, None)
                .await?
            else {
                return Ok(None);
            };
            let mut root =
                AggregateRoot::<A::State>::from_snapshot(id.clone(), snapshot.state, snapshot.version);
            hydrator::replay(&mut root, &tail)?;
            root
        } else {
            let Some(events) = self.store.load_all_events(id).await? else {
                return Ok(None);
            };
            hydrator::hydrate::<A::State>(id.clone(), &events)?
        };

        Ok(Some(A::from_root(root)))
    }

    /// Creates the stream for a new aggregate and returns it empty.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::DuplicateStream` if the stream already exists.
    pub async fn create(&self, id: &IdOf<A>) -> Result<A, DomainError> {
        self.store
            .create_event_stream(id, <A::State as AggregateState>::AGGREGATE_TYPE)
            .await?;
        Ok(A::from_root(AggregateRoot::<A::State>::new(id.clone())))
    }

    /// Loads the aggregate, creating its stream first if it does not exist.
    ///
    /// # Errors
    ///
    /// See [`try_load`](Self::try_load) and [`create`](Self::create).
    pub async fn load_or_create(&self, id: &IdOf<A>) -> Result<A, DomainError> {
        match self.try_load(id).await? {
            Some(aggregate) => Ok(aggregate),
            None => self.create(id).await,
        }
    }

    /// Commits the aggregate's pending events, expecting the stream to still
    /// be at the aggregate's current version.
    ///
    /// Without pending events this is a no-op. A snapshot failure after a
    /// successful commit is logged and does not fail the save.
    ///
    /// # Errors
    ///
    /// Propagates `EventStore::store_events` errors; the aggregate keeps its
    /// pending events in that case.
    #[tracing::instrument(skip_all, fields(stream_id = %aggregate.root().id()))]
    pub async fn save(&self, aggregate: &mut A) -> Result<Vec<StoredEvent>, DomainError> {
        let root = aggregate.root_mut();
        if root.uncommitted_events().is_empty() {
            tracing::debug!("nothing to save");
            return Ok(Vec::new());
        }

        let previous_version = root.current_version();
        let stored = self
            .store
            .store_events(root.id(), previous_version, root.uncommitted_events())
            .await?;
        root.mark_committed();

        if let Some(snapshots) = self
            .snapshots
            .as_ref()
            .filter(|_| self.policy.should_snapshot(previous_version, root.current_version()))
        {
            let snapshot = Snapshot {
                state: root.state().clone(),
                version: root.current_version(),
            };
            match snapshots.store_snapshot(root.id(), snapshot).await {
                Ok(()) => tracing::debug!(version = root.current_version(), "snapshot stored"),
                Err(error) => tracing::warn!(%error, "snapshot capture failed after commit"),
            }
        }

        Ok(stored)
    }
}

impl<A: Aggregate> fmt::Debug for AggregateContext<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateContext")
            .field("aggregate_type", &<A::State as AggregateState>::AGGREGATE_TYPE)
            .field("snapshots", &self.snapshots.is_some())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
