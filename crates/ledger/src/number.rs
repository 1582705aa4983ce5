//! Human-readable transaction numbers.
//!
//! Numbers are sequential per kind per year ("WD-2026-0007"), gapless, and
//! unique. Sequence assignment happens inside the store's commit lock, the
//! same way stream positions are assigned there; this module only owns the
//! value type and its formatting.

use serde::{Deserialize, Serialize};

use crate::transaction::TransactionKind;

/// A document number of the form `<PREFIX>-<year>-<seq>`, e.g. `WD-2026-0007`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionNumber {
    kind: TransactionKind,
    year: i32,
    seq: u32,
}

impl TransactionNumber {
    pub fn new(kind: TransactionKind, year: i32, seq: u32) -> Self {
        Self { kind, year, seq }
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }
}

impl core::fmt::Display for TransactionNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{}-{:04}", self.kind.prefix(), self.year, self.seq)
    }
}

impl TransactionKind {
    /// Document-number prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            TransactionKind::Receipt => "RC",
            TransactionKind::Withdrawal => "WD",
            TransactionKind::Return => "RT",
            TransactionKind::Change => "CH",
            TransactionKind::WorkshopDelivery => "WS",
            TransactionKind::WriteOff => "WO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_zero_padded_sequence() {
        let n = TransactionNumber::new(TransactionKind::Withdrawal, 2026, 7);
        assert_eq!(n.to_string(), "WD-2026-0007");

        let n = TransactionNumber::new(TransactionKind::Receipt, 2026, 12345);
        assert_eq!(n.to_string(), "RC-2026-12345");
    }

    #[test]
    fn orders_by_kind_year_then_sequence() {
        let a = TransactionNumber::new(TransactionKind::Receipt, 2026, 1);
        let b = TransactionNumber::new(TransactionKind::Receipt, 2026, 2);
        let c = TransactionNumber::new(TransactionKind::Receipt, 2027, 1);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn prefixes_are_distinct_per_kind() {
        let kinds = [
            TransactionKind::Receipt,
            TransactionKind::Withdrawal,
            TransactionKind::Return,
            TransactionKind::Change,
            TransactionKind::WorkshopDelivery,
            TransactionKind::WriteOff,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a.prefix(), b.prefix());
            }
        }
    }
}
