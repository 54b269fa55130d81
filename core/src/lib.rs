//! # Atelier Core
//!
//! Core traits and types for the Atelier reservation platform.
//!
//! The platform is built on a small functional core: domain logic lives in
//! [`reducer::Reducer`] implementations, which are pure functions from
//! `(State, Action, Environment)` to state changes plus [`effect::Effect`]
//! descriptions. Effects are values, not execution; the imperative shell
//! (services, HTTP handlers) runs them.
//!
//! ## Core Concepts
//!
//! - **State**: domain state for a feature
//! - **Action**: all possible inputs to a reducer (commands and events)
//! - **Reducer**: pure function `(State, Action, Environment) → Effects`
//! - **Effect**: side-effect description (not execution)
//! - **Environment**: injected dependencies via traits, e.g. [`environment::Clock`]

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - the core trait for business logic.
///
/// Reducers contain all business logic and are deterministic and testable:
/// every guard, transition, and derived value is computed here, while I/O is
/// described as effects and executed elsewhere.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The number of effects a reducer can return without heap allocation.
    pub const INLINE_EFFECTS: usize = 4;

    /// The Reducer trait - core abstraction for business logic.
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for BookingReducer {
    ///     type State = BookingState;
    ///     type Action = BookingAction;
    ///     type Environment = BookingEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut BookingState,
    ///         action: BookingAction,
    ///         env: &BookingEnvironment,
    ///     ) -> SmallVec<[Effect<BookingAction>; INLINE_EFFECTS]> {
    ///         // Guards, transitions, derived values
    ///         smallvec![]
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects.
        ///
        /// This is a pure function that:
        /// 1. Validates the action against the current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed by the caller
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; INLINE_EFFECTS]>;
    }
}

/// Effect module - side effect descriptions.
///
/// Effects describe side effects to be performed by the imperative shell.
/// They are values (not execution), returned from reducers.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Describes a side effect to be executed.
    ///
    /// Effects are NOT executed immediately. They are descriptions of what
    /// should happen, returned from reducers and executed by the service
    /// layer.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: the action type an effect can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation.
        ///
        /// Returns `Option<Action>` - if `Some`, the action is fed back into
        /// the reducer by the executing service.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async computation as an effect.
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// True if this effect does nothing.
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - dependency injection traits.
///
/// All external dependencies are abstracted behind traits and injected via
/// the Environment parameter of a reducer. This module holds the
/// dependencies shared by every feature; feature-specific dependencies live
/// with the feature.
pub mod environment {
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    /// Clock trait - abstracts time operations for testability.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Settable clock for deterministic tests.
    ///
    /// # Example
    ///
    /// ```
    /// use atelier_core::environment::{Clock, FixedClock};
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let before = clock.now();
    /// clock.advance(Duration::hours(2));
    /// assert_eq!(clock.now() - before, Duration::hours(2));
    /// ```
    #[derive(Debug)]
    pub struct FixedClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Creates a clock frozen at `now`.
        #[must_use]
        pub const fn new(now: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(now),
            }
        }

        /// Moves the clock forward by `delta`.
        pub fn advance(&self, delta: chrono::Duration) {
            match self.now.lock() {
                Ok(mut guard) => *guard = *guard + delta,
                Err(poisoned) => {
                    let mut guard = poisoned.into_inner();
                    *guard = *guard + delta;
                }
            }
        }

        /// Sets the clock to an absolute instant.
        pub fn set(&self, now: DateTime<Utc>) {
            match self.now.lock() {
                Ok(mut guard) => *guard = now,
                Err(poisoned) => *poisoned.into_inner() = now,
            }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            match self.now.lock() {
                Ok(guard) => *guard,
                Err(poisoned) => *poisoned.into_inner(),
            }
        }
    }
}
