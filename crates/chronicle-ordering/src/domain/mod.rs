//! Domain layer: events, the order aggregate, and commands.

pub mod aggregates;
pub mod commands;
pub mod events;
