//! Domain events for the Ordering context.

use chronicle_core::event::{DomainEvent, EventMetadata};
use chronicle_core::serializer::JsonEventSerializer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type constant for order placement.
pub const ORDER_PLACED_EVENT_TYPE: &str = "ordering.order_placed";
/// Event type constant for shipping address changes.
pub const SHIPPING_ADDRESS_CHANGED_EVENT_TYPE: &str = "ordering.shipping_address_changed";
/// Event type constant for the start of fulfilment.
pub const FULFILMENT_STARTED_EVENT_TYPE: &str = "ordering.fulfilment_started";
/// Event type constant for shipment.
pub const ORDER_SHIPPED_EVENT_TYPE: &str = "ordering.order_shipped";
/// Event type constant for delivery.
pub const ORDER_DELIVERED_EVENT_TYPE: &str = "ordering.order_delivered";

/// Emitted when a customer places an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    /// Who placed the order.
    pub customer: String,
    /// Where the order should be shipped.
    pub shipping_address: String,
    /// The product being ordered.
    pub product_id: Uuid,
}

/// Emitted when the shipping address is changed before shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddressChanged {
    /// The replacement address.
    pub new_address: String,
}

/// Emitted when the warehouse starts fulfilling the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfilmentStarted {}

/// Emitted when the order leaves the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderShipped {
    /// Carrier tracking number.
    pub tracking_number: String,
}

/// Emitted when the customer receives the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDelivered {}

/// Event payload variants for the Ordering context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEventKind {
    /// The order has been placed.
    OrderPlaced(OrderPlaced),
    /// The shipping address has changed.
    ShippingAddressChanged(ShippingAddressChanged),
    /// Fulfilment has started.
    FulfilmentStarted(FulfilmentStarted),
    /// The order has shipped.
    OrderShipped(OrderShipped),
    /// The order has been delivered.
    OrderDelivered(OrderDelivered),
}

/// Domain event envelope for the Ordering context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEvent {
    /// Event metadata.
    pub metadata: EventMetadata<Uuid>,
    /// Event-specific payload.
    pub kind: OrderEventKind,
}

impl DomainEvent for OrderEvent {
    type Id = Uuid;

    fn event_type(&self) -> &'static str {
        match &self.kind {
            OrderEventKind::OrderPlaced(_) => ORDER_PLACED_EVENT_TYPE,
            OrderEventKind::ShippingAddressChanged(_) => SHIPPING_ADDRESS_CHANGED_EVENT_TYPE,
            OrderEventKind::FulfilmentStarted(_) => FULFILMENT_STARTED_EVENT_TYPE,
            OrderEventKind::OrderShipped(_) => ORDER_SHIPPED_EVENT_TYPE,
            OrderEventKind::OrderDelivered(_) => ORDER_DELIVERED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match &self.kind {
            OrderEventKind::OrderPlaced(p) => serde_json::to_value(p),
            OrderEventKind::ShippingAddressChanged(p) => serde_json::to_value(p),
            OrderEventKind::FulfilmentStarted(p) => serde_json::to_value(p),
            OrderEventKind::OrderShipped(p) => serde_json::to_value(p),
            OrderEventKind::OrderDelivered(p) => serde_json::to_value(p),
        }
    }

    fn metadata(&self) -> &EventMetadata<Uuid> {
        &self.metadata
    }
}

/// Builds the serializer that knows every Ordering event tag.
#[must_use]
pub fn order_event_serializer() -> JsonEventSerializer<OrderEvent> {
    JsonEventSerializer::new()
        .register(ORDER_PLACED_EVENT_TYPE, |metadata, payload| {
            Ok(OrderEvent {
                metadata,
                kind: OrderEventKind::OrderPlaced(serde_json::from_value(payload)?),
            })
        })
        .register(SHIPPING_ADDRESS_CHANGED_EVENT_TYPE, |metadata, payload| {
            Ok(OrderEvent {
                metadata,
                kind: OrderEventKind::ShippingAddressChanged(serde_json::from_value(payload)?),
            })
        })
        .register(FULFILMENT_STARTED_EVENT_TYPE, |metadata, payload| {
            Ok(OrderEvent {
                metadata,
                kind: OrderEventKind::FulfilmentStarted(serde_json::from_value(payload)?),
            })
        })
        .register(ORDER_SHIPPED_EVENT_TYPE, |metadata, payload| {
            Ok(OrderEvent {
                metadata,
                kind: OrderEventKind::OrderShipped(serde_json::from_value(payload)?),
            })
        })
        .register(ORDER_DELIVERED_EVENT_TYPE, |metadata, payload| {
            Ok(OrderEvent {
                metadata,
                kind: OrderEventKind::OrderDelivered(serde_json::from_value(payload)?),
            })
        })
}
