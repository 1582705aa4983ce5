use chrono::{DateTime, Utc};

/// A domain event: an immutable fact about something that happened.
///
/// Implementations carry a stable type identifier and a schema version so
/// payloads can be routed and evolved independently of the Rust types.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable dotted event name (e.g. "catalog.item.created",
    /// "ledger.withdrawal.applied").
    fn event_type(&self) -> &'static str;

    /// Schema version of this event type, bumped on incompatible change.
    fn version(&self) -> u32;

    /// Business time: when the fact occurred, not when it was stored.
    fn occurred_at(&self) -> DateTime<Utc>;
}
