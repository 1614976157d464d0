//! Chronicle Ordering: an order lifecycle persisted through the event
//! store: placement, address changes, fulfilment, shipping and delivery.

pub mod application;
pub mod domain;
