//! The order aggregate for the Ordering context.

use chronicle_core::aggregate::{Aggregate, AggregateRoot, AggregateState};
use chronicle_core::clock::Clock;
use chronicle_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

use super::events::{
    FULFILMENT_STARTED_EVENT_TYPE, FulfilmentStarted, ORDER_DELIVERED_EVENT_TYPE,
    ORDER_PLACED_EVENT_TYPE, ORDER_SHIPPED_EVENT_TYPE, OrderDelivered, OrderEvent, OrderEventKind,
    OrderPlaced, OrderShipped, SHIPPING_ADDRESS_CHANGED_EVENT_TYPE, ShippingAddressChanged,
};

/// Where an order is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OrderStatus {
    /// The stream exists but no order has been placed on it yet.
    #[default]
    New,
    /// Placed and waiting for fulfilment.
    Placed,
    /// Fulfilment has started; the address can still change.
    BeingFulfilled,
    /// Handed to the carrier with a tracking number.
    Shipped,
    /// Received by the customer. No further transitions.
    Delivered,
}

/// State of an order, folded from its events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderState {
    /// Who placed the order. Empty until placed.
    pub customer: String,
    /// Current delivery address, updated by address changes.
    pub shipping_address: String,
    /// The ordered product, set when placed.
    pub product_id: Option<Uuid>,
    /// Carrier tracking number, set when shipped.
    pub tracking_number: Option<String>,
    /// Lifecycle status.
    pub status: OrderStatus,
}

impl AggregateState for OrderState {
    type Event = OrderEvent;

    const AGGREGATE_TYPE: &'static str = "ordering.order";

    fn apply(&mut self, event: &OrderEvent) -> Result<(), DomainError> {
        match &event.kind {
            OrderEventKind::OrderPlaced(payload) => {
                self.customer.clone_from(&payload.customer);
                self.shipping_address.clone_from(&payload.shipping_address);
                self.product_id = Some(payload.product_id);
                self.status = OrderStatus::Placed;
            }
            OrderEventKind::ShippingAddressChanged(payload) => {
                self.shipping_address.clone_from(&payload.new_address);
            }
            OrderEventKind::FulfilmentStarted(_) => self.status = OrderStatus::BeingFulfilled,
            OrderEventKind::OrderShipped(payload) => {
                self.tracking_number = Some(payload.tracking_number.clone());
                self.status = OrderStatus::Shipped;
            }
            OrderEventKind::OrderDelivered(_) => self.status = OrderStatus::Delivered,
        }
        Ok(())
    }
}

/// The aggregate root for an order.
#[derive(Debug)]
pub struct Order {
    root: AggregateRoot<OrderState>,
}

impl Order {
    /// Returns the order identifier.
    pub fn id(&self) -> Uuid {
        *self.root.id()
    }

    /// Returns the current state, pending events included.
    pub fn state(&self) -> &OrderState {
        self.root.state()
    }

    /// Returns the lifecycle status.
    pub fn status(&self) -> OrderStatus {
        self.root.state().status
    }

    /// Places the order, producing an `OrderPlaced` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank customer or address and
    /// `DomainError::InvalidState` if the order was already placed.
    pub fn place(
        &mut self,
        customer: &str,
        shipping_address: &str,
        product_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        require_text("customer", customer)?;
        require_text("shippingAddress", shipping_address)?;
        self.require_status(&[OrderStatus::New], "place")?;

        self.record(
            ORDER_PLACED_EVENT_TYPE,
            OrderEventKind::OrderPlaced(OrderPlaced {
                customer: customer.to_owned(),
                shipping_address: shipping_address.to_owned(),
                product_id,
            }),
            clock,
        )
    }

    /// Changes the shipping address, producing a `ShippingAddressChanged`
    /// event. Only allowed until the order ships.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank address and
    /// `DomainError::InvalidState` once the order has shipped.
    pub fn change_shipping_address(
        &mut self,
        new_address: &str,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        require_text("newAddress", new_address)?;
        self.require_status(
            &[OrderStatus::Placed, OrderStatus::BeingFulfilled],
            "change the shipping address of",
        )?;

        self.record(
            SHIPPING_ADDRESS_CHANGED_EVENT_TYPE,
            OrderEventKind::ShippingAddressChanged(ShippingAddressChanged {
                new_address: new_address.to_owned(),
            }),
            clock,
        )
    }

    /// Starts fulfilment, producing a `FulfilmentStarted` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` unless the order is placed.
    pub fn start_fulfilment(&mut self, clock: &dyn Clock) -> Result<(), DomainError> {
        self.require_status(&[OrderStatus::Placed], "start fulfilment of")?;
        self.record(
            FULFILMENT_STARTED_EVENT_TYPE,
            OrderEventKind::FulfilmentStarted(FulfilmentStarted {}),
            clock,
        )
    }

    /// Ships the order, producing an `OrderShipped` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank tracking number and
    /// `DomainError::InvalidState` unless fulfilment has started.
    pub fn ship(&mut self, tracking_number: &str, clock: &dyn Clock) -> Result<(), DomainError> {
        require_text("trackingNumber", tracking_number)?;
        self.require_status(&[OrderStatus::BeingFulfilled], "ship")?;
        self.record(
            ORDER_SHIPPED_EVENT_TYPE,
            OrderEventKind::OrderShipped(OrderShipped {
                tracking_number: tracking_number.to_owned(),
            }),
            clock,
        )
    }

    /// Marks the order delivered, producing an `OrderDelivered` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` unless the order has shipped.
    pub fn mark_delivered(&mut self, clock: &dyn Clock) -> Result<(), DomainError> {
        self.require_status(&[OrderStatus::Shipped], "deliver")?;
        self.record(
            ORDER_DELIVERED_EVENT_TYPE,
            OrderEventKind::OrderDelivered(OrderDelivered {}),
            clock,
        )
    }

    fn require_status(&self, allowed: &[OrderStatus], action: &str) -> Result<(), DomainError> {
        let status = self.status();
        if allowed.contains(&status) {
            Ok(())
        } else {
            Err(DomainError::InvalidState(format!(
                "cannot {action} order {} while it is {status:?}",
                self.id()
            )))
        }
    }

    fn record(
        &mut self,
        event_type: &'static str,
        kind: OrderEventKind,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let metadata = self.root.next_metadata(event_type, clock);
        self.root.when(OrderEvent { metadata, kind })
    }
}

impl Aggregate for Order {
    type State = OrderState;

    fn from_root(root: AggregateRoot<OrderState>) -> Self {
        Self { root }
    }

    fn root(&self) -> &AggregateRoot<OrderState> {
        &self.root
    }

    fn root_mut(&mut self) -> &mut AggregateRoot<OrderState> {
        &mut self.root
    }
}

/// Rejects empty or whitespace-only text fields.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(field, "must not be blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::event::DomainEvent;
    use chronicle_test_support::FixedClock;

    fn new_order() -> Order {
        Order::from_root(AggregateRoot::new(Uuid::new_v4()))
    }

    fn placed_order(clock: &FixedClock) -> Order {
        let mut order = new_order();
        order
            .place("ada", "12 Analytical Row", Uuid::new_v4(), clock)
            .unwrap();
        order
    }

    #[test]
    fn test_place_produces_order_placed_event() {
        // Arrange
        let clock = FixedClock::default();
        let mut order = new_order();
        let product_id = Uuid::new_v4();

        // Act
        order
            .place("ada", "12 Analytical Row", product_id, &clock)
            .unwrap();

        // Assert
        let events = order.root().uncommitted_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), ORDER_PLACED_EVENT_TYPE);
        assert_eq!(events[0].metadata.version, 1);
        assert_eq!(events[0].metadata.stream_id, order.id());
        assert_eq!(events[0].metadata.occurred_on, clock.0);
        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(order.state().product_id, Some(product_id));
    }

    #[test]
    fn test_place_twice_is_invalid_state() {
        let clock = FixedClock::default();
        let mut order = placed_order(&clock);

        let result = order.place("ada", "elsewhere", Uuid::new_v4(), &clock);

        assert!(matches!(result, Err(DomainError::InvalidState(_))));
        assert_eq!(order.root().uncommitted_events().len(), 1);
    }

    #[test]
    fn test_place_rejects_blank_customer() {
        let mut order = new_order();

        let result = order.place("  ", "12 Analytical Row", Uuid::new_v4(), &FixedClock::default());

        assert!(matches!(
            result,
            Err(DomainError::Validation { field: "customer", .. })
        ));
    }

    #[test]
    fn test_full_lifecycle_walks_statuses_in_order() {
        // Arrange
        let clock = FixedClock::default();
        let mut order = placed_order(&clock);

        // Act
        order.change_shipping_address("1 Difference Lane", &clock).unwrap();
        order.start_fulfilment(&clock).unwrap();
        order.change_shipping_address("2 Difference Lane", &clock).unwrap();
        order.ship("TRK-42", &clock).unwrap();
        order.mark_delivered(&clock).unwrap();

        // Assert
        let versions: Vec<i64> = order
            .root()
            .uncommitted_events()
            .iter()
            .map(|e| e.metadata.version)
            .collect();
        assert_eq!(versions, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(order.status(), OrderStatus::Delivered);
        assert_eq!(order.state().shipping_address, "2 Difference Lane");
        assert_eq!(order.state().tracking_number.as_deref(), Some("TRK-42"));
    }

    #[test]
    fn test_address_change_after_shipping_is_invalid_state() {
        let clock = FixedClock::default();
        let mut order = placed_order(&clock);
        order.start_fulfilment(&clock).unwrap();
        order.ship("TRK-42", &clock).unwrap();

        let result = order.change_shipping_address("too late", &clock);

        assert!(matches!(result, Err(DomainError::InvalidState(_))));
        assert_eq!(order.state().shipping_address, "12 Analytical Row");
    }

    #[test]
    fn test_transitions_cannot_skip_steps() {
        let clock = FixedClock::default();
        let mut order = placed_order(&clock);

        assert!(matches!(
            order.ship("TRK-1", &clock),
            Err(DomainError::InvalidState(_))
        ));
        assert!(matches!(
            order.mark_delivered(&clock),
            Err(DomainError::InvalidState(_))
        ));
        assert!(matches!(
            new_order().start_fulfilment(&clock),
            Err(DomainError::InvalidState(_))
        ));
    }
}
