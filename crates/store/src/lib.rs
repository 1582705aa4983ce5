//! Infrastructure layer: transactional store + application service.
//!
//! The [`store::LedgerStore`] trait is the persistence seam; the shipped
//! implementation keeps everything in memory behind a single lock. The
//! [`ledger::Ledger`] service orchestrates domain commands against the store
//! and publishes committed events to the bus.

pub mod ledger;
pub mod store;


pub use ledger::{Ledger, LedgerError};
pub use store::{InMemoryLedgerStore, LedgerStore, LineReceipt, StoreError};
