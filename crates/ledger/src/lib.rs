//! Stock-ledger domain module.
//!
//! Pure decision logic for stock-moving transactions: given a draft and a
//! snapshot of the catalog, either produce the complete list of per-line
//! stock movements or reject the draft as a whole. No IO, no locking — the
//! store supplies both.

pub mod number;
pub mod transaction;

pub use number::TransactionNumber;
pub use transaction::{
    AppliedTransaction, ChangePair, Line, Movement, ReturnCondition, TransactionApplied,
    TransactionBody, TransactionDraft, TransactionId, TransactionKind, plan,
};
