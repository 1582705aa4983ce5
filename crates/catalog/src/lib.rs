//! Catalog domain module.
//!
//! This crate contains business rules for the warehouse item catalog,
//! implemented purely as deterministic domain logic (no IO, no storage).
//! Stock levels live on items but are only ever moved through ledger
//! transactions; the catalog owns identity, thresholds and price history.

pub mod item;

pub use item::{
    CatalogCommand, CatalogEvent, CreateItem, Item, ItemCreated, ItemId, ItemPatch, ItemRetired,
    ItemUpdated, PriceEntry, PriceRecorded, RetireItem, StockAdjusted, UpdateItem,
    UNSPECIFIED_SUPPLIER,
};
