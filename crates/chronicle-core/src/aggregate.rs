//! Aggregate root abstraction.

use crate::clock::Clock;
use crate::error::DomainError;
use crate::event::{DomainEvent, EventMetadata};

/// State projection of one aggregate type, folded from its events.
///
/// `apply` is the dispatch table: implementations match exhaustively on
/// their event enum so every event kind is routed to exactly one handler.
/// Returning an error marks the event as one this state cannot accept,
/// which aborts reconstruction.
pub trait AggregateState: Default + Clone + std::fmt::Debug + Send + Sync + 'static {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Tag recorded as the stream name when a stream is created.
    const AGGREGATE_TYPE: &'static str;

    /// Folds one event into the state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Reconstruction` for events this state has no
    /// handler for.
    fn apply(&mut self, event: &Self::Event) -> Result<(), DomainError>;
}

/// Identifier type of the stream behind an aggregate state.
pub type StreamIdOf<S> = <<S as AggregateState>::Event as DomainEvent>::Id;

/// In-memory aggregate: state, durable version, and pending events.
#[derive(Debug, Clone)]
pub struct AggregateRoot<S: AggregateState> {
    id: StreamIdOf<S>,
    current_version: i64,
    state: S,
    uncommitted_events: Vec<S::Event>,
}

impl<S: AggregateState> AggregateRoot<S> {
    /// Creates an aggregate with default state and no history.
    #[must_use]
    pub fn new(id: StreamIdOf<S>) -> Self {
        Self::from_snapshot(id, S::default(), 0)
    }

    /// Creates an aggregate positioned at a previously captured state.
    #[must_use]
    pub fn from_snapshot(id: StreamIdOf<S>, state: S, current_version: i64) -> Self {
        Self {
            id,
            current_version,
            state,
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the aggregate (stream) identifier.
    pub fn id(&self) -> &StreamIdOf<S> {
        &self.id
    }

    /// Returns the number of durably persisted events.
    pub fn current_version(&self) -> i64 {
        self.current_version
    }

    /// Returns the state, reflecting committed and pending events.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Returns uncommitted events produced by command handling.
    pub fn uncommitted_events(&self) -> &[S::Event] {
        &self.uncommitted_events
    }

    /// Returns the version the next recorded event must carry.
    #[allow(clippy::cast_possible_wrap)]
    pub fn next_version(&self) -> i64 {
        self.current_version + self.uncommitted_events.len() as i64 + 1
    }

    /// Builds metadata for the next event of this aggregate.
    pub fn next_metadata(
        &self,
        event_type: &'static str,
        clock: &dyn Clock,
    ) -> EventMetadata<StreamIdOf<S>> {
        EventMetadata::new(self.id.clone(), self.next_version(), clock.now(), event_type)
    }

    /// Records a new event: folds it into state and buffers it for commit.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the event belongs to another
    /// stream or does not carry [`next_version`](Self::next_version), and
    /// propagates any error from the state's `apply`.
    pub fn when(&mut self, event: S::Event) -> Result<(), DomainError> {
        let metadata = event.metadata();
        if metadata.stream_id != self.id {
            return Err(DomainError::validation(
                "event",
                format!(
                    "event for stream {} recorded on aggregate {}",
                    metadata.stream_id, self.id
                ),
            ));
        }
        let expected = self.next_version();
        if metadata.version != expected {
            return Err(DomainError::validation(
                "event",
                format!(
                    "event carries version {}, aggregate {} expects {expected}",
                    metadata.version, self.id
                ),
            ));
        }

        self.state.apply(&event)?;
        self.uncommitted_events.push(event);
        Ok(())
    }

    /// Marks buffered events as durable after a successful store.
    #[allow(clippy::cast_possible_wrap)]
    pub fn mark_committed(&mut self) {
        self.current_version += self.uncommitted_events.len() as i64;
        self.uncommitted_events.clear();
    }

    /// Folds an already persisted event and advances the durable version.
    pub(crate) fn apply_committed(&mut self, event: &S::Event) -> Result<(), DomainError> {
        self.state.apply(event)?;
        self.current_version = event.metadata().version;
        Ok(())
    }
}

/// A domain aggregate built on top of an [`AggregateRoot`].
///
/// Bounded contexts wrap the root in their own type to hang business
/// operations on it.
pub trait Aggregate: Send + Sync {
    /// State projection of this aggregate.
    type State: AggregateState;

    /// Wraps a loaded or freshly created root.
    fn from_root(root: AggregateRoot<Self::State>) -> Self;

    /// Returns the underlying root.
    fn root(&self) -> &AggregateRoot<Self::State>;

    /// Returns the underlying root mutably.
    fn root_mut(&mut self) -> &mut AggregateRoot<Self::State>;
}

impl<S: AggregateState> Aggregate for AggregateRoot<S> {
    type State = S;

    fn from_root(root: AggregateRoot<S>) -> Self {
        root
    }

    fn root(&self) -> &AggregateRoot<S> {
        self
    }

    fn root_mut(&mut self) -> &mut AggregateRoot<S> {
        self
    }
}
