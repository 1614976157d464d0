//! Commands for the Ordering context.

use uuid::Uuid;

/// Command to place a new order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The order identifier (becomes the stream id).
    pub order_id: Uuid,
    /// Who is ordering.
    pub customer: String,
    /// Where to ship.
    pub shipping_address: String,
    /// The product being ordered.
    pub product_id: Uuid,
}

/// Command to change where an order is shipped.
#[derive(Debug, Clone)]
pub struct ChangeShippingAddress {
    /// The order identifier.
    pub order_id: Uuid,
    /// The replacement address.
    pub new_address: String,
}

/// Command to start fulfilling an order.
#[derive(Debug, Clone)]
pub struct StartFulfilment {
    /// The order identifier.
    pub order_id: Uuid,
}

/// Command to ship an order.
#[derive(Debug, Clone)]
pub struct ShipOrder {
    /// The order identifier.
    pub order_id: Uuid,
    /// Carrier tracking number.
    pub tracking_number: String,
}

/// Command to mark an order delivered.
#[derive(Debug, Clone)]
pub struct MarkDelivered {
    /// The order identifier.
    pub order_id: Uuid,
}
