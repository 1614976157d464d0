//! Chronicle Core: event-sourcing building blocks.
//!
//! This crate defines the storage gateway contract, the event store that
//! maps domain events onto stored records, aggregate roots and their
//! replay-based hydration, and the aggregate context that ties them
//! together. It contains no database driver code.

pub mod aggregate;
pub mod batch;
pub mod clock;
pub mod context;
pub mod error;
pub mod event;
pub mod hydrator;
pub mod repository;
pub mod serializer;
pub mod snapshot;
pub mod store;
pub mod stream;
