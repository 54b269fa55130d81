//! # Atelier Testing
//!
//! Testing utilities for Atelier reducers.
//!
//! The main entry point is [`ReducerTest`], a fluent Given-When-Then harness
//! for exercising a reducer in isolation with a controlled environment.

mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};
