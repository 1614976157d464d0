//! Command handlers for the Ordering context.
//!
//! Each handler loads (or creates) the order through the aggregate context,
//! executes the command on it, and persists the resulting events.

use std::sync::Arc;

use chronicle_core::aggregate::Aggregate;
use chronicle_core::batch::{BatchIdProvider, RandomBatchIds};
use chronicle_core::clock::Clock;
use chronicle_core::context::AggregateContext;
use chronicle_core::error::DomainError;
use chronicle_core::repository::{EventRepository, StoredEvent};
use chronicle_core::store::EventStore;
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderStatus, require_text};
use crate::domain::commands::{
    ChangeShippingAddress, MarkDelivered, PlaceOrder, ShipOrder, StartFulfilment,
};
use crate::domain::events::order_event_serializer;

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct OrderCommandResult {
    /// The aggregate ID affected by the command.
    pub aggregate_id: Uuid,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

/// Wires an order context over `repository` with random batch ids.
#[must_use]
pub fn order_context(repository: Arc<dyn EventRepository<Id = Uuid>>) -> AggregateContext<Order> {
    order_context_with(repository, Arc::new(RandomBatchIds))
}

/// Wires an order context with an explicit batch-id provider.
#[must_use]
pub fn order_context_with(
    repository: Arc<dyn EventRepository<Id = Uuid>>,
    batch_ids: Arc<dyn BatchIdProvider>,
) -> AggregateContext<Order> {
    AggregateContext::new(EventStore::new(
        repository,
        Arc::new(order_event_serializer()),
        batch_ids,
    ))
}

async fn load(ctx: &AggregateContext<Order>, order_id: Uuid) -> Result<Order, DomainError> {
    ctx.try_load(&order_id)
        .await?
        .ok_or_else(|| DomainError::StreamNotFound(order_id.to_string()))
}

async fn persist(
    ctx: &AggregateContext<Order>,
    mut order: Order,
) -> Result<OrderCommandResult, DomainError> {
    let stored_events = ctx.save(&mut order).await?;
    tracing::debug!(
        order_id = %order.id(),
        version = order.root().current_version(),
        "order saved"
    );
    Ok(OrderCommandResult {
        aggregate_id: order.id(),
        stored_events,
    })
}

/// Handles the `PlaceOrder` command: loads the order stream (creating it if
/// needed), places the order, and persists the resulting event.
///
/// A stream left empty by an earlier failed attempt is reused, so the
/// command can be retried.
///
/// # Errors
///
/// Returns `DomainError::Validation` for blank fields (before any storage
/// call), `DomainError::DuplicateStream` if the order was already placed,
/// and any store error.
#[tracing::instrument(skip_all, fields(order_id = %command.order_id))]
pub async fn handle_place_order(
    command: &PlaceOrder,
    clock: &dyn Clock,
    ctx: &AggregateContext<Order>,
) -> Result<OrderCommandResult, DomainError> {
    require_text("customer", &command.customer)?;
    require_text("shippingAddress", &command.shipping_address)?;

    let mut order = ctx.load_or_create(&command.order_id).await?;
    if order.status() != OrderStatus::New {
        return Err(DomainError::DuplicateStream(command.order_id.to_string()));
    }
    order.place(
        &command.customer,
        &command.shipping_address,
        command.product_id,
        clock,
    )?;
    persist(ctx, order).await
}

/// Handles the `ChangeShippingAddress` command.
///
/// # Errors
///
/// Returns `DomainError::StreamNotFound` for an unknown order,
/// `DomainError::InvalidState` once it has shipped, and any store error.
#[tracing::instrument(skip_all, fields(order_id = %command.order_id))]
pub async fn handle_change_shipping_address(
    command: &ChangeShippingAddress,
    clock: &dyn Clock,
    ctx: &AggregateContext<Order>,
) -> Result<OrderCommandResult, DomainError> {
    let mut order = load(ctx, command.order_id).await?;
    order.change_shipping_address(&command.new_address, clock)?;
    persist(ctx, order).await
}

/// Handles the `StartFulfilment` command.
///
/// # Errors
///
/// Returns `DomainError::StreamNotFound` for an unknown order,
/// `DomainError::InvalidState` unless it is placed, and any store error.
#[tracing::instrument(skip_all, fields(order_id = %command.order_id))]
pub async fn handle_start_fulfilment(
    command: &StartFulfilment,
    clock: &dyn Clock,
    ctx: &AggregateContext<Order>,
) -> Result<OrderCommandResult, DomainError> {
    let mut order = load(ctx, command.order_id).await?;
    order.start_fulfilment(clock)?;
    persist(ctx, order).await
}

/// Handles the `ShipOrder` command.
///
/// # Errors
///
/// Returns `DomainError::StreamNotFound` for an unknown order,
/// `DomainError::InvalidState` unless fulfilment has started, and any store
/// error.
#[tracing::instrument(skip_all, fields(order_id = %command.order_id))]
pub async fn handle_ship_order(
    command: &ShipOrder,
    clock: &dyn Clock,
    ctx: &AggregateContext<Order>,
) -> Result<OrderCommandResult, DomainError> {
    let mut order = load(ctx, command.order_id).await?;
    order.ship(&command.tracking_number, clock)?;
    persist(ctx, order).await
}

/// Handles the `MarkDelivered` command.
///
/// # Errors
///
/// Returns `DomainError::StreamNotFound` for an unknown order,
/// `DomainError::InvalidState` unless it has shipped, and any store error.
#[tracing::instrument(skip_all, fields(order_id = %command.order_id))]
pub async fn handle_mark_delivered(
    command: &MarkDelivered,
    clock: &dyn Clock,
    ctx: &AggregateContext<Order>,
) -> Result<OrderCommandResult, DomainError> {
    let mut order = load(ctx, command.order_id).await?;
    order.mark_delivered(clock)?;
    persist(ctx, order).await
}
