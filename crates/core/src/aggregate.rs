//! Command/event-shaped aggregate traits.

use crate::error::{DomainError, DomainResult};

/// Minimal interface every aggregate root exposes: a typed identity and a
/// state version.
///
/// Items, stock transactions and purchase orders all implement this; the
/// store keys records by `Id` and guards writes with `version()`.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state, one step
    /// per applied event.
    fn version(&self) -> u64;
}

/// What a writer expects the stored version to be.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// No expectation; the write always proceeds.
    Any,
    /// The stored aggregate must be at exactly this version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

/// Pure command/event execution.
///
/// Deciding (`handle`) and evolving (`apply`) are split so decision logic
/// can be exercised without a store: `handle` inspects current state and a
/// command and returns the events that would result, `apply` folds one event
/// into state. Neither performs IO.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Fold a single event into in-memory state.
    ///
    /// Must be deterministic, and must advance `version()` by one per event
    /// so version checks stay meaningful.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events a command produces against current state, without
    /// mutating anything.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
