use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Datelike;

use depot_catalog::{CatalogCommand, CatalogEvent, Item, ItemId, ItemPatch, StockAdjusted, UpdateItem};
use depot_core::{Aggregate, AggregateRoot, ExpectedVersion};
use depot_ledger::{
    AppliedTransaction, Line, Movement, TransactionBody, TransactionDraft, TransactionId,
    TransactionKind, TransactionNumber, plan,
};
use depot_purchasing::{
    PurchaseOrder, PurchaseOrderCommand, PurchaseOrderEvent, PurchaseOrderId, ReceiveLine,
};

use super::r#trait::{LedgerStore, LineReceipt, StoreError};

#[derive(Debug, Default)]
struct State {
    items: HashMap<ItemId, Item>,
    orders: HashMap<PurchaseOrderId, PurchaseOrder>,
    log: Vec<AppliedTransaction>,
    /// Next sequence per (kind, year). Incremented only on commit, so
    /// numbers stay gapless.
    counters: HashMap<(TransactionKind, i32), u32>,
}

impl State {
    /// Assign the next number for the draft's kind and year, apply the
    /// planned movements and append to the log. Callers validate the draft
    /// first; this only mutates.
    fn commit_transaction(
        &mut self,
        id: TransactionId,
        draft: TransactionDraft,
        movements: Vec<Movement>,
    ) -> AppliedTransaction {
        let kind = draft.body.kind();
        let year = draft.occurred_at.year();
        let seq = self.counters.get(&(kind, year)).copied().unwrap_or(0) + 1;
        let number = TransactionNumber::new(kind, year, seq);

        for movement in &movements {
            // Planner only emits movements for items it resolved.
            if let Some(item) = self.items.get_mut(&movement.item_id) {
                item.apply(&CatalogEvent::StockAdjusted(StockAdjusted {
                    item_id: movement.item_id,
                    delta: movement.delta,
                    reference: number.to_string(),
                    occurred_at: draft.occurred_at,
                }));
            }
        }

        let applied = AppliedTransaction {
            id,
            number,
            body: draft.body,
            actor: draft.actor,
            department: draft.department,
            movements,
            occurred_at: draft.occurred_at,
        };

        self.counters.insert((kind, year), seq);
        self.log.push(applied.clone());
        applied
    }
}

/// In-memory transactional store.
///
/// All state sits behind one `RwLock`; each mutating call takes the write
/// guard once and commits or rejects inside it, so partial application is
/// never observable and concurrent transactions cannot lose updates.
///
/// Intended for tests/dev and single-process deployments. Not optimized for
/// performance.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<State>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Internal("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Internal("lock poisoned".to_string()))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn insert_item(&self, item: Item) -> Result<(), StoreError> {
        let mut state = self.write()?;

        if state.items.contains_key(&item.id_typed()) {
            return Err(StoreError::DuplicateKey(format!(
                "item id {}",
                item.id_typed()
            )));
        }
        // Code uniqueness is catalog-wide and case-insensitive: "FIL-001"
        // and "fil-001" are the same human-facing code.
        let code = item.code().to_lowercase();
        if state
            .items
            .values()
            .any(|existing| existing.code().to_lowercase() == code)
        {
            return Err(StoreError::DuplicateKey(format!(
                "item code {}",
                item.code()
            )));
        }

        state.items.insert(item.id_typed(), item);
        Ok(())
    }

    fn fetch_item(&self, id: ItemId) -> Result<Item, StoreError> {
        let state = self.read()?;
        state.items.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    fn put_item(&self, item: Item, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut state = self.write()?;

        let current = state.items.get(&item.id_typed()).ok_or(StoreError::NotFound)?;
        if !expected.matches(current.version()) {
            return Err(StoreError::Concurrency(format!(
                "item {}: expected {expected:?}, found {}",
                item.id_typed(),
                current.version()
            )));
        }

        state.items.insert(item.id_typed(), item);
        Ok(())
    }

    fn items(&self) -> Result<Vec<Item>, StoreError> {
        let state = self.read()?;
        Ok(state.items.values().cloned().collect())
    }

    fn apply_transaction(
        &self,
        id: TransactionId,
        draft: TransactionDraft,
    ) -> Result<AppliedTransaction, StoreError> {
        let mut state = self.write()?;

        // Plan against current stock inside the commit guard: all lines are
        // validated before any mutation, so a rejection leaves everything
        // untouched.
        let movements = plan(&draft, &state.items)?;

        Ok(state.commit_transaction(id, draft, movements))
    }

    fn transactions(&self) -> Result<Vec<AppliedTransaction>, StoreError> {
        let state = self.read()?;
        Ok(state.log.clone())
    }

    fn receive_order_line(
        &self,
        id: TransactionId,
        cmd: ReceiveLine,
        actor: String,
        department: String,
    ) -> Result<LineReceipt, StoreError> {
        let mut state = self.write()?;

        let mut order = state
            .orders
            .get(&cmd.order_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        let order_events = order.handle(&PurchaseOrderCommand::ReceiveLine(cmd))?;
        let received = order_events
            .iter()
            .find_map(|e| match e {
                PurchaseOrderEvent::LineReceived(r) => Some(r.clone()),
                _ => None,
            })
            .ok_or_else(|| {
                StoreError::Internal("line receipt produced no LineReceived event".to_string())
            })?;

        let item = state
            .items
            .get(&received.item_id)
            .ok_or(StoreError::NotFound)?;

        let draft = TransactionDraft {
            body: TransactionBody::Receipt {
                lines: vec![Line {
                    item_id: received.item_id,
                    quantity: received.quantity,
                    unit: item.unit().to_string(),
                }],
            },
            actor,
            department,
            occurred_at: received.occurred_at,
        };

        // Everything up to here is pure validation; a failure leaves order,
        // item and log untouched.
        let movements = plan(&draft, &state.items)?;

        let item_events = if item.last_purchase_price() != Some(received.unit_price) {
            item.handle(&CatalogCommand::UpdateItem(UpdateItem {
                item_id: received.item_id,
                patch: ItemPatch {
                    last_purchase_price: Some(received.unit_price),
                    supplier: Some(received.supplier.clone()),
                    ..ItemPatch::default()
                },
                occurred_at: received.occurred_at,
            }))?
        } else {
            Vec::new()
        };

        let transaction = state.commit_transaction(id, draft, movements);

        if let Some(item) = state.items.get_mut(&received.item_id) {
            for e in &item_events {
                item.apply(e);
            }
        }
        for e in &order_events {
            order.apply(e);
        }
        state.orders.insert(order.id_typed(), order.clone());

        let item = state
            .items
            .get(&received.item_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;

        Ok(LineReceipt {
            order,
            transaction,
            item,
            order_events,
            item_events,
        })
    }

    fn insert_order(&self, order: PurchaseOrder) -> Result<(), StoreError> {
        let mut state = self.write()?;

        if state.orders.contains_key(&order.id_typed()) {
            return Err(StoreError::DuplicateKey(format!(
                "order id {}",
                order.id_typed()
            )));
        }

        state.orders.insert(order.id_typed(), order);
        Ok(())
    }

    fn fetch_order(&self, id: PurchaseOrderId) -> Result<PurchaseOrder, StoreError> {
        let state = self.read()?;
        state.orders.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    fn put_order(&self, order: PurchaseOrder, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut state = self.write()?;

        let current = state
            .orders
            .get(&order.id_typed())
            .ok_or(StoreError::NotFound)?;
        if !expected.matches(current.version()) {
            return Err(StoreError::Concurrency(format!(
                "order {}: expected {expected:?}, found {}",
                order.id_typed(),
                current.version()
            )));
        }

        state.orders.insert(order.id_typed(), order);
        Ok(())
    }
}
