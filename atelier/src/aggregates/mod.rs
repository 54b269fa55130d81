//! Aggregates for the reservation platform.
//!
//! Each aggregate owns the lifecycle of one entity and is implemented as a
//! reducer over its state. The imperative shell (the booking service) loads
//! state from the store, runs the reducer, persists the result, and executes
//! the returned effects.

pub mod booking;
