//! Domain events + publication mechanics.
//!
//! Committed catalog changes and applied stock transactions are published as
//! envelopes on an [`EventBus`]; downstream consumers (document generation,
//! read models) subscribe and must tolerate at-least-once delivery.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
