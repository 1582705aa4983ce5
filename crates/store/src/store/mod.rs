//! Transactional store boundary.
//!
//! This module defines an infrastructure-facing abstraction for the catalog,
//! transaction log and purchase-order tables without making any storage
//! assumptions. The shipped implementation is in-memory; the trait is the
//! seam a database-backed store would implement.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{LedgerStore, LineReceipt, StoreError};
