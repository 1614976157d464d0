//! Chronicle Event Store: PostgreSQL implementation of the storage gateway.
//!
//! Streams live in `event_streams`, their events in `stored_events`. The
//! primary key on `(stream_id, version)` is what rejects the loser of a
//! concurrent append.

pub mod config;
pub mod pg_event_repository;
pub mod schema;
