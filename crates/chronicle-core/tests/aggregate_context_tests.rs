//! Aggregate context: load, create and save through the event store.

mod common;

use std::sync::Arc;

use chronicle_core::aggregate::Aggregate;
use chronicle_core::context::AggregateContext;
use chronicle_core::error::DomainError;
use chronicle_core::repository::EventRepository;
use chronicle_core::snapshot::{Snapshot, SnapshotPolicy};
use chronicle_test_support::{FailingSnapshotStore, InMemoryEventRepository, InMemorySnapshotStore};
use common::{Ticket, TicketState, clock, commented, opened, ticket_store};

const STREAM: &str = "ticket-7";

fn context(repository: Arc<InMemoryEventRepository<String>>) -> AggregateContext<Ticket> {
    AggregateContext::new(ticket_store(repository))
}

#[tokio::test]
async fn test_try_load_unknown_stream_is_none() {
    let ctx = context(Arc::new(InMemoryEventRepository::new()));

    let loaded = ctx.try_load(&STREAM.to_owned()).await.unwrap();

    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_create_then_save_then_load_round_trips_state() {
    // Arrange
    let repository = Arc::new(InMemoryEventRepository::new());
    let ctx = context(repository.clone());
    let id = STREAM.to_owned();
    let mut ticket = ctx.create(&id).await.unwrap();
    ticket.open("vpn drops hourly", &clock()).unwrap();
    ticket.comment("only on wifi", &clock()).unwrap();

    // Act
    let stored = ctx.save(&mut ticket).await.unwrap();
    let loaded = ctx.try_load(&id).await.unwrap().unwrap();

    // Assert
    assert_eq!(stored.len(), 2);
    assert_eq!(ticket.root().current_version(), 2);
    assert!(ticket.root().uncommitted_events().is_empty());
    assert_eq!(loaded.root().current_version(), 2);
    assert_eq!(loaded.root().state(), ticket.root().state());
    assert_eq!(
        repository.stream_name(&id).as_deref(),
        Some("support.ticket")
    );
}

#[tokio::test]
async fn test_save_without_pending_events_is_a_no_op() {
    let ctx = context(Arc::new(InMemoryEventRepository::new()));
    let mut ticket = ctx.create(&STREAM.to_owned()).await.unwrap();

    let stored = ctx.save(&mut ticket).await.unwrap();

    assert!(stored.is_empty());
    assert_eq!(ticket.root().current_version(), 0);
}

#[tokio::test]
async fn test_create_existing_stream_fails_with_duplicate() {
    let ctx = context(Arc::new(InMemoryEventRepository::new()));
    ctx.create(&STREAM.to_owned()).await.unwrap();

    let result = ctx.create(&STREAM.to_owned()).await;

    assert!(matches!(result, Err(DomainError::DuplicateStream(_))));
}

#[tokio::test]
async fn test_load_or_create_reuses_existing_stream() {
    // Arrange
    let ctx = context(Arc::new(InMemoryEventRepository::new()));
    let id = STREAM.to_owned();
    let mut first = ctx.load_or_create(&id).await.unwrap();
    first.open("keyboard sticky", &clock()).unwrap();
    ctx.save(&mut first).await.unwrap();

    // Act
    let second = ctx.load_or_create(&id).await.unwrap();

    // Assert
    assert_eq!(second.root().current_version(), 1);
    assert_eq!(second.root().state().title, "keyboard sticky");
}

#[tokio::test]
async fn test_concurrent_save_loses_with_conflict_and_keeps_pending_events() {
    // Arrange
    let ctx = context(Arc::new(InMemoryEventRepository::new()));
    let id = STREAM.to_owned();
    let mut ticket = ctx.create(&id).await.unwrap();
    ticket.open("monitor flickers", &clock()).unwrap();
    ctx.save(&mut ticket).await.unwrap();
    let mut winner = ctx.try_load(&id).await.unwrap().unwrap();
    let mut loser = ctx.try_load(&id).await.unwrap().unwrap();
    winner.comment("cable replaced", &clock()).unwrap();
    loser.comment("driver updated", &clock()).unwrap();
    ctx.save(&mut winner).await.unwrap();

    // Act
    let result = ctx.save(&mut loser).await;

    // Assert
    assert!(result.unwrap_err().is_concurrency_conflict());
    assert_eq!(loser.root().uncommitted_events().len(), 1);
    assert_eq!(loser.root().current_version(), 1);
    let reloaded = ctx.try_load(&id).await.unwrap().unwrap();
    assert_eq!(reloaded.root().state().comments, vec!["cable replaced"]);
}

#[tokio::test]
async fn test_save_takes_snapshot_when_policy_interval_is_crossed() {
    // Arrange
    let snapshots = Arc::new(InMemorySnapshotStore::<String, TicketState>::new());
    let ctx = context(Arc::new(InMemoryEventRepository::new()))
        .with_snapshots(snapshots.clone(), SnapshotPolicy::Every(2));
    let id = STREAM.to_owned();
    let mut ticket = ctx.create(&id).await.unwrap();
    ticket.open("mouse lag", &clock()).unwrap();
    ctx.save(&mut ticket).await.unwrap();
    assert_eq!(snapshots.writes(), 0);

    // Act
    ticket.comment("new batteries", &clock()).unwrap();
    ctx.save(&mut ticket).await.unwrap();

    // Assert
    let snapshot = snapshots.get(&id).unwrap();
    assert_eq!(snapshot.version, 2);
    assert_eq!(&snapshot.state, ticket.root().state());
    assert_eq!(snapshots.writes(), 1);
}

#[tokio::test]
async fn test_try_load_replays_only_events_after_snapshot() {
    // Arrange
    let repository = Arc::new(InMemoryEventRepository::new());
    let id = STREAM.to_owned();
    repository.create_stream(&id, "support.ticket").await.unwrap();
    let store = ticket_store(repository.clone());
    store
        .store_events(
            &id,
            0,
            &[
                opened(STREAM, 1, "printer jam"),
                commented(STREAM, 2, "opened tray"),
                commented(STREAM, 3, "found sandwich"),
            ],
        )
        .await
        .unwrap();
    // The snapshot deliberately differs from what replaying 1..=2 would give,
    // proving those events are skipped.
    let snapshots = Arc::new(InMemorySnapshotStore::<String, TicketState>::new());
    snapshots.insert(
        id.clone(),
        Snapshot {
            state: TicketState {
                title: "from snapshot".to_owned(),
                comments: Vec::new(),
                closed: false,
            },
            version: 2,
        },
    );
    let ctx = AggregateContext::<Ticket>::new(store).with_snapshots(snapshots, SnapshotPolicy::Never);

    // Act
    let loaded = ctx.try_load(&id).await.unwrap().unwrap();

    // Assert
    assert_eq!(loaded.root().current_version(), 3);
    assert_eq!(loaded.root().state().title, "from snapshot");
    assert_eq!(loaded.root().state().comments, vec!["found sandwich"]);
}

#[tokio::test]
async fn test_snapshot_failure_after_commit_does_not_fail_save() {
    // Arrange
    let ctx = context(Arc::new(InMemoryEventRepository::new())).with_snapshots(
        Arc::new(FailingSnapshotStore::<TicketState>::new()),
        SnapshotPolicy::Every(1),
    );
    let id = STREAM.to_owned();
    let mut ticket = ctx.create(&id).await.unwrap();
    ticket.open("fan noise", &clock()).unwrap();

    // Act
    let stored = ctx.save(&mut ticket).await.unwrap();

    // Assert
    assert_eq!(stored.len(), 1);
    assert_eq!(ctx.try_load(&id).await.unwrap().unwrap().root().current_version(), 1);
}
