use std::sync::Arc;

use thiserror::Error;

use depot_catalog::{CatalogEvent, Item, ItemId};
use depot_core::{DomainError, ExpectedVersion};
use depot_ledger::{AppliedTransaction, TransactionDraft, TransactionId};
use depot_purchasing::{PurchaseOrder, PurchaseOrderEvent, PurchaseOrderId, ReceiveLine};

/// Store operation error.
///
/// Infrastructure failures (locking, concurrency) plus domain rejections
/// surfaced from atomic transaction application, which plans inside the
/// commit boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed (stale version on write).
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// A unique key (item id, item code, order id) already exists.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// The referenced record does not exist.
    #[error("record not found")]
    NotFound,

    /// A transaction draft was rejected by the planner (validation,
    /// insufficient stock, retired/unknown item).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Internal store fault (e.g. poisoned lock).
    #[error("store fault: {0}")]
    Internal(String),
}

/// Outcome of a committed purchase-order line receipt.
///
/// Carries the post-commit aggregates plus the domain events the service
/// publishes once the commit stands.
#[derive(Debug, Clone)]
pub struct LineReceipt {
    pub order: PurchaseOrder,
    pub transaction: AppliedTransaction,
    pub item: Item,
    pub order_events: Vec<PurchaseOrderEvent>,
    pub item_events: Vec<CatalogEvent>,
}

/// Transactional facade over the ledger's state.
///
/// Every method is atomic: it either commits fully or leaves the store
/// untouched. `apply_transaction` is the multi-item commit boundary — it
/// validates the whole draft against current stock, assigns the next
/// document number for the draft's kind and year, applies every movement,
/// and appends to the transaction log, all under one guard. Numbers are
/// therefore gapless and unique even under concurrent submission.
/// `receive_order_line` widens that boundary to span the order transition,
/// the backing stock receipt and the price entry together.
///
/// Single-record writes (`put_item`, `put_order`) carry an
/// [`ExpectedVersion`] so read-modify-write callers detect interleaving
/// writers instead of losing updates.
pub trait LedgerStore: Send + Sync {
    fn insert_item(&self, item: Item) -> Result<(), StoreError>;

    fn fetch_item(&self, id: ItemId) -> Result<Item, StoreError>;

    /// Replace an item, expecting the stored version to match.
    fn put_item(&self, item: Item, expected: ExpectedVersion) -> Result<(), StoreError>;

    /// Snapshot of all items (including retired ones) at call time.
    fn items(&self) -> Result<Vec<Item>, StoreError>;

    /// Atomically validate, number, apply and log a stock transaction.
    fn apply_transaction(
        &self,
        id: TransactionId,
        draft: TransactionDraft,
    ) -> Result<AppliedTransaction, StoreError>;

    /// Snapshot of the transaction log, in commit order.
    fn transactions(&self) -> Result<Vec<AppliedTransaction>, StoreError>;

    /// Atomically record a purchase-order line receipt: order transition,
    /// backing `Receipt` stock transaction, and price entry (when the
    /// delivered price differs from the item's last purchase price) commit
    /// together or not at all, so a rejected or conflicted receipt leaves no
    /// partial state and retrying can never double-count stock.
    fn receive_order_line(
        &self,
        id: TransactionId,
        cmd: ReceiveLine,
        actor: String,
        department: String,
    ) -> Result<LineReceipt, StoreError>;

    fn insert_order(&self, order: PurchaseOrder) -> Result<(), StoreError>;

    fn fetch_order(&self, id: PurchaseOrderId) -> Result<PurchaseOrder, StoreError>;

    /// Replace an order, expecting the stored version to match.
    fn put_order(&self, order: PurchaseOrder, expected: ExpectedVersion) -> Result<(), StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn insert_item(&self, item: Item) -> Result<(), StoreError> {
        (**self).insert_item(item)
    }

    fn fetch_item(&self, id: ItemId) -> Result<Item, StoreError> {
        (**self).fetch_item(id)
    }

    fn put_item(&self, item: Item, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).put_item(item, expected)
    }

    fn items(&self) -> Result<Vec<Item>, StoreError> {
        (**self).items()
    }

    fn apply_transaction(
        &self,
        id: TransactionId,
        draft: TransactionDraft,
    ) -> Result<AppliedTransaction, StoreError> {
        (**self).apply_transaction(id, draft)
    }

    fn transactions(&self) -> Result<Vec<AppliedTransaction>, StoreError> {
        (**self).transactions()
    }

    fn receive_order_line(
        &self,
        id: TransactionId,
        cmd: ReceiveLine,
        actor: String,
        department: String,
    ) -> Result<LineReceipt, StoreError> {
        (**self).receive_order_line(id, cmd, actor, department)
    }

    fn insert_order(&self, order: PurchaseOrder) -> Result<(), StoreError> {
        (**self).insert_order(order)
    }

    fn fetch_order(&self, id: PurchaseOrderId) -> Result<PurchaseOrder, StoreError> {
        (**self).fetch_order(id)
    }

    fn put_order(&self, order: PurchaseOrder, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).put_order(order, expected)
    }
}
