//! Replay of persisted events onto aggregate roots.

use crate::aggregate::{AggregateRoot, AggregateState, StreamIdOf};
use crate::error::DomainError;
use crate::event::DomainEvent;

/// Folds already persisted `events` into `root` without buffering them.
///
/// Events must belong to the root's stream and continue its version
/// sequence without gaps. Afterwards `current_version` equals the version
/// of the last replayed event.
///
/// # Errors
///
/// Returns `DomainError::Reconstruction` if the root has pending events, if
/// an event belongs to another stream or is out of sequence, or if the
/// state rejects an event. Replay stops at the first failure.
pub fn replay<S: AggregateState>(
    root: &mut AggregateRoot<S>,
    events: &[S::Event],
) -> Result<(), DomainError> {
    let stream_id = root.id().to_string();
    let broken = |message: String| DomainError::Reconstruction {
        stream_id: stream_id.clone(),
        message,
    };

    if !root.uncommitted_events().is_empty() {
        return Err(broken(format!(
            "{} uncommitted events would be reordered by replay",
            root.uncommitted_events().len()
        )));
    }

    for event in events {
        let metadata = event.metadata();
        if &metadata.stream_id != root.id() {
            return Err(broken(format!(
                "event version {} belongs to stream {}",
                metadata.version, metadata.stream_id
            )));
        }
        let expected = root.current_version() + 1;
        if metadata.version != expected {
            return Err(broken(format!(
                "expected version {expected}, got {}",
                metadata.version
            )));
        }
        tracing::trace!(
            stream_id = %stream_id,
            version = metadata.version,
            event_type = event.event_type(),
            "applying event"
        );
        root.apply_committed(event)?;
    }

    Ok(())
}

/// Builds a fresh root for `id` and replays `events` onto it.
///
/// # Errors
///
/// See [`replay`].
pub fn hydrate<S: AggregateState>(
    id: StreamIdOf<S>,
    events: &[S::Event],
) -> Result<AggregateRoot<S>, DomainError> {
    let mut root = AggregateRoot::new(id);
    replay(&mut root, events)?;
    tracing::debug!(
        stream_id = %root.id(),
        version = root.current_version(),
        events = events.len(),
        "aggregate hydrated"
    );
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{CounterEventKind, CounterState, counter_event};
    use uuid::Uuid;

    #[test]
    fn test_hydrate_from_no_events_yields_default_state() {
        let root = hydrate::<CounterState>(Uuid::new_v4(), &[]).unwrap();

        assert_eq!(root.current_version(), 0);
        assert_eq!(root.state(), &CounterState::default());
    }

    #[test]
    fn test_hydrate_matches_live_application() {
        // Arrange
        let id = Uuid::new_v4();
        let events = vec![
            counter_event(id, 1, CounterEventKind::Added(3)),
            counter_event(id, 2, CounterEventKind::Reset),
            counter_event(id, 3, CounterEventKind::Added(7)),
        ];
        let mut live = AggregateRoot::<CounterState>::new(id);
        for event in &events {
            live.when(event.clone()).unwrap();
        }

        // Act
        let hydrated = hydrate::<CounterState>(id, &events).unwrap();

        // Assert
        assert_eq!(hydrated.state(), live.state());
        assert_eq!(hydrated.current_version(), 3);
        assert!(hydrated.uncommitted_events().is_empty());
    }

    #[test]
    fn test_replay_continues_from_snapshot_version() {
        let id = Uuid::new_v4();
        let mut root = AggregateRoot::from_snapshot(
            id,
            CounterState {
                total: 10,
                locked: false,
            },
            4,
        );

        replay(&mut root, &[counter_event(id, 5, CounterEventKind::Added(1))]).unwrap();

        assert_eq!(root.current_version(), 5);
        assert_eq!(root.state().total, 11);
    }

    #[test]
    fn test_replay_rejects_version_gap() {
        let id = Uuid::new_v4();
        let events = vec![
            counter_event(id, 1, CounterEventKind::Added(1)),
            counter_event(id, 3, CounterEventKind::Added(1)),
        ];

        let result = hydrate::<CounterState>(id, &events);

        match result {
            Err(DomainError::Reconstruction { message, .. }) => {
                assert!(message.contains("expected version 2"));
            }
            other => panic!("expected Reconstruction, got {other:?}"),
        }
    }

    #[test]
    fn test_replay_rejects_foreign_event() {
        let id = Uuid::new_v4();
        let events = vec![counter_event(Uuid::new_v4(), 1, CounterEventKind::Added(1))];

        let result = hydrate::<CounterState>(id, &events);

        assert!(matches!(result, Err(DomainError::Reconstruction { .. })));
    }

    #[test]
    fn test_replay_surfaces_unhandled_event() {
        let id = Uuid::new_v4();
        let mut root = AggregateRoot::from_snapshot(
            id,
            CounterState {
                total: 2,
                locked: true,
            },
            1,
        );

        let result = replay(&mut root, &[counter_event(id, 2, CounterEventKind::Reset)]);

        match result {
            Err(DomainError::Reconstruction { message, .. }) => {
                assert!(message.contains("unhandled event"));
            }
            other => panic!("expected Reconstruction, got {other:?}"),
        }
    }

    #[test]
    fn test_replay_refuses_root_with_pending_events() {
        let id = Uuid::new_v4();
        let mut root = AggregateRoot::<CounterState>::new(id);
        root.when(counter_event(id, 1, CounterEventKind::Added(1)))
            .unwrap();

        let result = replay(&mut root, &[counter_event(id, 1, CounterEventKind::Added(1))]);

        assert!(matches!(result, Err(DomainError::Reconstruction { .. })));
    }
}
