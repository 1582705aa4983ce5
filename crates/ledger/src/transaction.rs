use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_catalog::{Item, ItemId};
use depot_core::{AggregateId, DomainError, ValueObject};
use depot_events::Event;

use crate::number::TransactionNumber;

/// Stock transaction identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub AggregateId);

impl TransactionId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// One line of a stock transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub item_id: ItemId,
    pub quantity: i64,
    pub unit: String,
}

impl ValueObject for Line {}

/// Condition of returned goods.
///
/// Only goods returned in good condition go back into stock. Damaged and
/// expired returns are recorded for the audit trail but move nothing; scrap
/// leaves through an explicit [`TransactionBody::WriteOff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnCondition {
    Good,
    Damaged,
    Expired,
}

/// One swap of a `Change` transaction: the old item goes out, the new one
/// comes in. Both legs commit or neither does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePair {
    pub old: Line,
    pub new: Line,
}

impl ValueObject for ChangePair {}

/// Transaction kind (numbering scope, direction resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Receipt,
    Withdrawal,
    Return,
    Change,
    WorkshopDelivery,
    WriteOff,
}

/// Kind-specific payload of a stock transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionBody {
    /// Goods entering the warehouse (purchase-order fulfilment included).
    Receipt { lines: Vec<Line> },
    /// Goods leaving the warehouse against a department request.
    Withdrawal { lines: Vec<Line> },
    /// Goods coming back from a department.
    Return {
        condition: ReturnCondition,
        lines: Vec<Line>,
    },
    /// Item substitution: paired old-out / new-in legs.
    Change { pairs: Vec<ChangePair> },
    /// Goods handed over to the workshop.
    WorkshopDelivery { lines: Vec<Line> },
    /// Scrapped stock leaving explicitly (damaged, expired, lost).
    WriteOff { lines: Vec<Line> },
}

impl TransactionBody {
    pub fn kind(&self) -> TransactionKind {
        match self {
            TransactionBody::Receipt { .. } => TransactionKind::Receipt,
            TransactionBody::Withdrawal { .. } => TransactionKind::Withdrawal,
            TransactionBody::Return { .. } => TransactionKind::Return,
            TransactionBody::Change { .. } => TransactionKind::Change,
            TransactionBody::WorkshopDelivery { .. } => TransactionKind::WorkshopDelivery,
            TransactionBody::WriteOff { .. } => TransactionKind::WriteOff,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            TransactionBody::Receipt { lines }
            | TransactionBody::Withdrawal { lines }
            | TransactionBody::Return { lines, .. }
            | TransactionBody::WorkshopDelivery { lines }
            | TransactionBody::WriteOff { lines } => lines.is_empty(),
            TransactionBody::Change { pairs } => pairs.is_empty(),
        }
    }
}

/// A stock transaction as submitted by a caller (no id/number assigned yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub body: TransactionBody,
    pub actor: String,
    pub department: String,
    pub occurred_at: DateTime<Utc>,
}

/// One resolved stock movement: signed delta for a single line.
///
/// Movements are per line, not netted, so the audit trail keeps each leg of
/// a `Change` and repeated lines for the same item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub item_id: ItemId,
    pub delta: i64,
}

impl ValueObject for Movement {}

/// A committed transaction: draft + assigned id, number and movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedTransaction {
    pub id: TransactionId,
    pub number: TransactionNumber,
    pub body: TransactionBody,
    pub actor: String,
    pub department: String,
    pub movements: Vec<Movement>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionApplied (published after the store commit; document
/// generation consumes this).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionApplied {
    pub transaction: AppliedTransaction,
}

impl Event for TransactionApplied {
    fn event_type(&self) -> &'static str {
        match self.transaction.body.kind() {
            TransactionKind::Receipt => "ledger.receipt.applied",
            TransactionKind::Withdrawal => "ledger.withdrawal.applied",
            TransactionKind::Return => "ledger.return.applied",
            TransactionKind::Change => "ledger.change.applied",
            TransactionKind::WorkshopDelivery => "ledger.workshop_delivery.applied",
            TransactionKind::WriteOff => "ledger.write_off.applied",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.transaction.occurred_at
    }
}

/// Resolve a draft into movements against a catalog snapshot, or reject the
/// whole draft.
///
/// All lines are validated before any movement is reported, so a caller that
/// applies the returned movements atomically can never observe partial
/// application. Repeated lines for one item are checked against the running
/// projected stock, not each line in isolation.
pub fn plan(
    draft: &TransactionDraft,
    items: &HashMap<ItemId, Item>,
) -> Result<Vec<Movement>, DomainError> {
    if draft.actor.trim().is_empty() {
        return Err(DomainError::validation("actor cannot be empty"));
    }
    if draft.body.is_empty() {
        return Err(DomainError::validation(
            "transaction must have at least one line",
        ));
    }

    let mut planner = Planner::new(items);

    match &draft.body {
        TransactionBody::Receipt { lines } => {
            for line in lines {
                planner.push(line, Direction::In)?;
            }
        }
        TransactionBody::Withdrawal { lines }
        | TransactionBody::WorkshopDelivery { lines }
        | TransactionBody::WriteOff { lines } => {
            for line in lines {
                planner.push(line, Direction::Out)?;
            }
        }
        TransactionBody::Return { condition, lines } => {
            let direction = match condition {
                ReturnCondition::Good => Direction::In,
                // Recorded but stockless; write-offs are the explicit exit.
                ReturnCondition::Damaged | ReturnCondition::Expired => Direction::None,
            };
            for line in lines {
                planner.push(line, direction)?;
            }
        }
        TransactionBody::Change { pairs } => {
            for pair in pairs {
                planner.push(&pair.old, Direction::Out)?;
                planner.push(&pair.new, Direction::In)?;
            }
        }
    }

    Ok(planner.into_movements())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    In,
    Out,
    None,
}

/// Accumulates movements while tracking projected stock per item, so a batch
/// is validated as a unit.
struct Planner<'a> {
    items: &'a HashMap<ItemId, Item>,
    projected: HashMap<ItemId, i64>,
    movements: Vec<Movement>,
}

impl<'a> Planner<'a> {
    fn new(items: &'a HashMap<ItemId, Item>) -> Self {
        Self {
            items,
            projected: HashMap::new(),
            movements: Vec::new(),
        }
    }

    fn push(&mut self, line: &Line, direction: Direction) -> Result<(), DomainError> {
        if line.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let item = self.items.get(&line.item_id).ok_or(DomainError::NotFound)?;
        if item.is_retired() {
            return Err(DomainError::invariant(format!(
                "item {} is retired",
                item.code()
            )));
        }

        let delta = match direction {
            Direction::In => line.quantity,
            Direction::Out => -line.quantity,
            Direction::None => return Ok(()),
        };

        let projected = self.projected.entry(line.item_id).or_insert(item.stock());
        let next = projected.checked_add(delta).ok_or_else(|| {
            DomainError::validation(format!(
                "item {}: stock adjustment overflows",
                item.code()
            ))
        })?;
        if next < 0 {
            return Err(DomainError::insufficient_stock(format!(
                "item {}: stock {}, requested {}",
                item.code(),
                *projected,
                line.quantity
            )));
        }
        *projected = next;

        self.movements.push(Movement {
            item_id: line.item_id,
            delta,
        });
        Ok(())
    }

    fn into_movements(self) -> Vec<Movement> {
        self.movements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_catalog::{CatalogCommand, CatalogEvent, CreateItem, StockAdjusted};
    use depot_core::Aggregate;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn stocked_item(code: &str, stock: i64) -> Item {
        let id = ItemId::new(AggregateId::new());
        let mut item = Item::empty(id);
        let events = item
            .handle(&CatalogCommand::CreateItem(CreateItem {
                item_id: id,
                code: code.to_string(),
                name: format!("{code} test item"),
                category: "Parts".to_string(),
                subcategory: "Misc".to_string(),
                unit: "pcs".to_string(),
                min_stock: 0,
                max_stock: 1000,
                location: "A-01".to_string(),
                supplier: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        for e in &events {
            item.apply(e);
        }
        if stock > 0 {
            item.apply(&CatalogEvent::StockAdjusted(StockAdjusted {
                item_id: id,
                delta: stock,
                reference: "RC-2026-0001".to_string(),
                occurred_at: test_time(),
            }));
        }
        item
    }

    fn catalog(items: &[&Item]) -> HashMap<ItemId, Item> {
        items
            .iter()
            .map(|i| (i.id_typed(), (*i).clone()))
            .collect()
    }

    fn line(item: &Item, quantity: i64) -> Line {
        Line {
            item_id: item.id_typed(),
            quantity,
            unit: "pcs".to_string(),
        }
    }

    fn draft(body: TransactionBody) -> TransactionDraft {
        TransactionDraft {
            body,
            actor: "j.smith".to_string(),
            department: "maintenance".to_string(),
            occurred_at: test_time(),
        }
    }

    #[test]
    fn receipt_plans_positive_movements() {
        let item = stocked_item("FIL-001", 0);
        let items = catalog(&[&item]);

        let movements = plan(
            &draft(TransactionBody::Receipt {
                lines: vec![line(&item, 15)],
            }),
            &items,
        )
        .unwrap();

        assert_eq!(movements, vec![Movement { item_id: item.id_typed(), delta: 15 }]);
    }

    #[test]
    fn withdrawal_beyond_stock_is_rejected() {
        let item = stocked_item("FIL-001", 10);
        let items = catalog(&[&item]);

        let err = plan(
            &draft(TransactionBody::Withdrawal {
                lines: vec![line(&item, 11)],
            }),
            &items,
        )
        .unwrap_err();

        match err {
            DomainError::InsufficientStock(msg) if msg.contains("FIL-001") => {}
            _ => panic!("Expected InsufficientStock"),
        }
    }

    #[test]
    fn repeated_lines_are_checked_against_running_stock() {
        let item = stocked_item("FIL-001", 15);
        let items = catalog(&[&item]);

        // Each line fits on its own; together they overdraw.
        let err = plan(
            &draft(TransactionBody::Withdrawal {
                lines: vec![line(&item, 8), line(&item, 8)],
            }),
            &items,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock(_)));
    }

    #[test]
    fn damaged_return_moves_nothing() {
        let item = stocked_item("FIL-001", 5);
        let items = catalog(&[&item]);

        let movements = plan(
            &draft(TransactionBody::Return {
                condition: ReturnCondition::Damaged,
                lines: vec![line(&item, 3)],
            }),
            &items,
        )
        .unwrap();
        assert!(movements.is_empty());

        let movements = plan(
            &draft(TransactionBody::Return {
                condition: ReturnCondition::Good,
                lines: vec![line(&item, 3)],
            }),
            &items,
        )
        .unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].delta, 3);
    }

    #[test]
    fn change_plans_both_legs_or_neither() {
        let a = stocked_item("A-001", 20);
        let b = stocked_item("B-001", 3);
        let items = catalog(&[&a, &b]);

        let movements = plan(
            &draft(TransactionBody::Change {
                pairs: vec![ChangePair {
                    old: line(&a, 5),
                    new: line(&b, 5),
                }],
            }),
            &items,
        )
        .unwrap();
        assert_eq!(
            movements,
            vec![
                Movement { item_id: a.id_typed(), delta: -5 },
                Movement { item_id: b.id_typed(), delta: 5 },
            ]
        );

        // Old item short: the whole pair is rejected.
        let a_short = stocked_item("A-002", 3);
        let items = catalog(&[&a_short, &b]);
        let err = plan(
            &draft(TransactionBody::Change {
                pairs: vec![ChangePair {
                    old: line(&a_short, 5),
                    new: line(&b, 5),
                }],
            }),
            &items,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock(_)));
    }

    #[test]
    fn unknown_and_retired_items_reject_the_draft() {
        let item = stocked_item("FIL-001", 10);
        let items = catalog(&[&item]);

        let ghost = Line {
            item_id: ItemId::new(AggregateId::new()),
            quantity: 1,
            unit: "pcs".to_string(),
        };
        let err = plan(
            &draft(TransactionBody::Withdrawal { lines: vec![ghost] }),
            &items,
        )
        .unwrap_err();
        assert_eq!(err, DomainError::NotFound);

        let mut retired = stocked_item("OLD-001", 10);
        retired.apply(&CatalogEvent::ItemRetired(depot_catalog::ItemRetired {
            item_id: retired.id_typed(),
            occurred_at: test_time(),
        }));
        let items = catalog(&[&retired]);
        let err = plan(
            &draft(TransactionBody::Withdrawal {
                lines: vec![line(&retired, 1)],
            }),
            &items,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn receipt_overflowing_stock_is_rejected() {
        let item = stocked_item("FIL-001", i64::MAX - 1);
        let items = catalog(&[&item]);

        let err = plan(
            &draft(TransactionBody::Receipt {
                lines: vec![line(&item, 2)],
            }),
            &items,
        )
        .unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("overflows") => {}
            _ => panic!("Expected validation error for overflowing adjustment"),
        }
    }

    #[test]
    fn empty_and_nonpositive_drafts_are_rejected() {
        let item = stocked_item("FIL-001", 10);
        let items = catalog(&[&item]);

        let err = plan(
            &draft(TransactionBody::Withdrawal { lines: vec![] }),
            &items,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = plan(
            &draft(TransactionBody::Withdrawal {
                lines: vec![line(&item, 0)],
            }),
            &items,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: applying any accepted plan to the snapshot stock never
        /// drives any item negative.
        #[test]
        fn accepted_plans_never_overdraw(
            stock in 0i64..100,
            quantities in prop::collection::vec(1i64..40, 1..8)
        ) {
            let item = stocked_item("FIL-001", stock);
            let items = catalog(&[&item]);

            let lines: Vec<Line> = quantities.iter().map(|q| line(&item, *q)).collect();
            let result = plan(
                &draft(TransactionBody::Withdrawal { lines }),
                &items,
            );

            if let Ok(movements) = result {
                let net: i64 = movements.iter().map(|m| m.delta).sum();
                prop_assert!(stock + net >= 0);
            } else {
                // Rejected as a whole: the snapshot is untouched by contract.
                prop_assert!(quantities.iter().sum::<i64>() > stock);
            }
        }
    }
}
