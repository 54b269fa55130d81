//! Application services.
//!
//! The imperative shell around the booking reducer: loads state from the
//! store, runs transitions, persists results, and executes effects.

mod service;

pub use service::{BookingService, CancellationOutcome};
