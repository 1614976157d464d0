//! Query handlers for the Ordering context.
//!
//! This module contains query handlers that rebuild aggregates through the
//! aggregate context and return read-only view DTOs.

use chronicle_core::aggregate::Aggregate;
use chronicle_core::context::AggregateContext;
use chronicle_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderStatus};

/// Read-only view of an order aggregate.
#[derive(Debug, Serialize)]
pub struct OrderView {
    /// The order identifier.
    pub order_id: Uuid,
    /// Who placed the order.
    pub customer: String,
    /// Current delivery address.
    pub shipping_address: String,
    /// The ordered product, if placed.
    pub product_id: Option<Uuid>,
    /// Carrier tracking number, once shipped.
    pub tracking_number: Option<String>,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Number of persisted events.
    pub version: i64,
}

/// Retrieves an order by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::StreamNotFound` if the order stream does not exist
/// and propagates load errors.
pub async fn get_order_by_id(
    order_id: Uuid,
    ctx: &AggregateContext<Order>,
) -> Result<OrderView, DomainError> {
    let order = ctx
        .try_load(&order_id)
        .await?
        .ok_or_else(|| DomainError::StreamNotFound(order_id.to_string()))?;
    let state = order.state().clone();
    Ok(OrderView {
        order_id,
        customer: state.customer,
        shipping_address: state.shipping_address,
        product_id: state.product_id,
        tracking_number: state.tracking_number,
        status: state.status,
        version: order.root().current_version(),
    })
}
