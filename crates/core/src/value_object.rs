//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value** — two value
/// objects with the same attribute values are the same value. Transaction
/// lines and price-history entries are the canonical examples here: a
/// `PriceEntry { price: 1250, supplier: "Bosch" }` recorded twice is the same
/// observation, whereas two items sharing a name are still distinct items.
///
/// To "modify" a value object, build a new one. This keeps them safe to share
/// and lets them behave like primitives in collections and comparisons.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
