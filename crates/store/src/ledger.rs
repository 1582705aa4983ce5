//! Ledger application service (orchestration).
//!
//! The [`Ledger`] sits between callers (presentation layer, document
//! generation) and the infrastructure (store, bus). It executes domain
//! commands through the aggregates' pure `handle`/`apply` logic, persists
//! the outcome through the [`LedgerStore`], and publishes committed events
//! afterwards — publish happens only after the commit succeeds, so a
//! subscriber never sees an event for state that was rolled back.
//!
//! There is no global instance: construct one `Ledger` at process start and
//! hand it to callers by reference.

use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use depot_catalog::{
    CatalogCommand, CreateItem, Item, ItemId, PriceEntry, RetireItem, UpdateItem,
};
use depot_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ExpectedVersion};
use depot_events::{Event, EventBus, EventEnvelope};
use depot_ledger::{AppliedTransaction, TransactionApplied, TransactionDraft, TransactionId};
use depot_purchasing::{
    AddOrderLine, CancelOrder, CreateOrder, MarkSent, PurchaseOrder, PurchaseOrderCommand,
    PurchaseOrderId, ReceiveLine,
};

use crate::store::{LedgerStore, StoreError};

/// Department recorded on stock transactions generated by purchase-order
/// receipts.
const RECEIVING_DEPARTMENT: &str = "warehouse";

/// Service-level error, as surfaced to callers.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Bad input shape or constraints (deterministic).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated (deterministic).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// The referenced item/transaction/order does not exist.
    #[error("not found")]
    NotFound,

    /// A unique key collided (e.g. item code on create).
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// A stock-decreasing transaction would drive stock negative.
    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    /// A concurrent writer got there first; reload and retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure fault in the store.
    #[error("store error: {0}")]
    Store(StoreError),

    /// Publication failed after a successful commit (at-least-once; the
    /// commit stands, retrying publication is safe).
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => LedgerError::Validation(msg),
            DomainError::InvariantViolation(msg) => LedgerError::InvariantViolation(msg),
            DomainError::InvalidId(msg) => LedgerError::Validation(msg),
            DomainError::NotFound => LedgerError::NotFound,
            DomainError::Duplicate(msg) => LedgerError::Duplicate(msg),
            DomainError::InsufficientStock(msg) => LedgerError::InsufficientStock(msg),
            DomainError::Conflict(msg) => LedgerError::Conflict(msg),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => LedgerError::Conflict(msg),
            StoreError::DuplicateKey(msg) => LedgerError::Duplicate(msg),
            StoreError::NotFound => LedgerError::NotFound,
            StoreError::Domain(e) => e.into(),
            other => LedgerError::Store(other),
        }
    }
}

/// The inventory ledger service.
///
/// Generic over store and bus so tests can use isolated in-memory fixtures
/// and production can swap in durable backends without touching domain code.
#[derive(Debug)]
pub struct Ledger<S, B> {
    store: S,
    bus: B,
}

impl<S, B> Ledger<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> Ledger<S, B>
where
    S: LedgerStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    // ---- catalog ----------------------------------------------------------

    pub fn create_item(&self, cmd: CreateItem) -> Result<Item, LedgerError> {
        let mut item = Item::empty(cmd.item_id);
        let events = item.handle(&CatalogCommand::CreateItem(cmd))?;
        for e in &events {
            item.apply(e);
        }

        self.store.insert_item(item.clone())?;
        tracing::info!(code = %item.code(), "item created");

        self.publish_all(item.id_typed().0, "catalog.item", item.version(), &events)?;
        Ok(item)
    }

    pub fn update_item(&self, cmd: UpdateItem) -> Result<Item, LedgerError> {
        let mut item = self.store.fetch_item(cmd.item_id)?;
        let expected = ExpectedVersion::Exact(item.version());

        let events = item.handle(&CatalogCommand::UpdateItem(cmd))?;
        for e in &events {
            item.apply(e);
        }

        self.store.put_item(item.clone(), expected)?;
        self.publish_all(item.id_typed().0, "catalog.item", item.version(), &events)?;
        Ok(item)
    }

    pub fn retire_item(&self, cmd: RetireItem) -> Result<Item, LedgerError> {
        let mut item = self.store.fetch_item(cmd.item_id)?;
        let expected = ExpectedVersion::Exact(item.version());

        let events = item.handle(&CatalogCommand::RetireItem(cmd))?;
        for e in &events {
            item.apply(e);
        }

        self.store.put_item(item.clone(), expected)?;
        tracing::info!(code = %item.code(), "item retired");

        self.publish_all(item.id_typed().0, "catalog.item", item.version(), &events)?;
        Ok(item)
    }

    /// Case-insensitive substring search over code, name, category and
    /// subcategory. Snapshot at call time; retired items are excluded.
    pub fn search_items(&self, query: &str) -> Result<Vec<Item>, LedgerError> {
        let items = self.store.items()?;
        Ok(items
            .into_iter()
            .filter(|i| !i.is_retired() && i.matches(query))
            .collect())
    }

    /// All live items at or below their minimum stock threshold.
    pub fn low_stock_items(&self) -> Result<Vec<Item>, LedgerError> {
        let items = self.store.items()?;
        Ok(items
            .into_iter()
            .filter(|i| !i.is_retired() && i.is_low_stock())
            .collect())
    }

    /// Price history for an item, newest first. Empty if no price was ever
    /// recorded; `NotFound` only if the item does not exist.
    pub fn price_history(&self, item_id: ItemId) -> Result<Vec<PriceEntry>, LedgerError> {
        let item = self.store.fetch_item(item_id)?;
        Ok(item.price_history().to_vec())
    }

    // ---- transactions -----------------------------------------------------

    /// Apply a stock transaction: commit fully or reject fully.
    ///
    /// On success the returned transaction carries its assigned id and
    /// document number; callers use it to drive document generation.
    pub fn apply(&self, draft: TransactionDraft) -> Result<AppliedTransaction, LedgerError> {
        let id = TransactionId::new(AggregateId::new());
        let kind = draft.body.kind();

        let applied = match self.store.apply_transaction(id, draft) {
            Ok(applied) => applied,
            Err(e) => {
                tracing::warn!(kind = ?kind, error = %e, "transaction rejected");
                return Err(e.into());
            }
        };
        tracing::info!(number = %applied.number, kind = ?kind, "transaction applied");

        let event = TransactionApplied {
            transaction: applied.clone(),
        };
        self.publish_all(applied.id.0, "ledger.transaction", 1, core::slice::from_ref(&event))?;
        Ok(applied)
    }

    /// Transaction log snapshot, in commit order.
    pub fn transactions(&self) -> Result<Vec<AppliedTransaction>, LedgerError> {
        Ok(self.store.transactions()?)
    }

    // ---- purchase orders --------------------------------------------------

    pub fn create_order(&self, cmd: CreateOrder) -> Result<PurchaseOrder, LedgerError> {
        let mut order = PurchaseOrder::empty(cmd.order_id);
        let events = order.handle(&PurchaseOrderCommand::CreateOrder(cmd))?;
        for e in &events {
            order.apply(e);
        }

        self.store.insert_order(order.clone())?;
        self.publish_all(order.id_typed().0, "purchasing.order", order.version(), &events)?;
        Ok(order)
    }

    pub fn add_order_line(&self, cmd: AddOrderLine) -> Result<PurchaseOrder, LedgerError> {
        self.execute_order_command(cmd.order_id, PurchaseOrderCommand::AddOrderLine(cmd))
    }

    pub fn mark_sent(&self, cmd: MarkSent) -> Result<PurchaseOrder, LedgerError> {
        self.execute_order_command(cmd.order_id, PurchaseOrderCommand::MarkSent(cmd))
    }

    pub fn cancel_order(&self, cmd: CancelOrder) -> Result<PurchaseOrder, LedgerError> {
        self.execute_order_command(cmd.order_id, PurchaseOrderCommand::CancelOrder(cmd))
    }

    /// Record a line receipt against a sent purchase order.
    ///
    /// One commit, three effects: the order transition (`Received`, or
    /// `Completed` when every line is fully received), a backing `Receipt`
    /// stock transaction, and a catalog price entry when the delivery price
    /// differs from the item's last purchase price (attributed to the
    /// order's supplier). The store commits all of them under one boundary,
    /// so a rejected or conflicted receipt leaves no partial state and a
    /// retry never books stock twice.
    pub fn receive_line(
        &self,
        cmd: ReceiveLine,
        received_by: impl Into<String>,
    ) -> Result<(PurchaseOrder, AppliedTransaction), LedgerError> {
        let id = TransactionId::new(AggregateId::new());
        let order_id = cmd.order_id;

        let receipt = match self.store.receive_order_line(
            id,
            cmd,
            received_by.into(),
            RECEIVING_DEPARTMENT.to_string(),
        ) {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(order = %order_id, error = %e, "line receipt rejected");
                return Err(e.into());
            }
        };
        tracing::info!(
            order = %receipt.order.id_typed(),
            number = %receipt.transaction.number,
            "purchase order line received"
        );

        let event = TransactionApplied {
            transaction: receipt.transaction.clone(),
        };
        self.publish_all(
            receipt.transaction.id.0,
            "ledger.transaction",
            1,
            core::slice::from_ref(&event),
        )?;
        if !receipt.item_events.is_empty() {
            self.publish_all(
                receipt.item.id_typed().0,
                "catalog.item",
                receipt.item.version(),
                &receipt.item_events,
            )?;
        }
        self.publish_all(
            receipt.order.id_typed().0,
            "purchasing.order",
            receipt.order.version(),
            &receipt.order_events,
        )?;
        Ok((receipt.order, receipt.transaction))
    }

    pub fn fetch_order(&self, id: PurchaseOrderId) -> Result<PurchaseOrder, LedgerError> {
        Ok(self.store.fetch_order(id)?)
    }

    // ---- internals --------------------------------------------------------

    /// Shared read-modify-write path for order commands.
    fn execute_order_command(
        &self,
        order_id: PurchaseOrderId,
        command: PurchaseOrderCommand,
    ) -> Result<PurchaseOrder, LedgerError> {
        let mut order = self.store.fetch_order(order_id)?;
        let expected = ExpectedVersion::Exact(order.version());

        let events = order.handle(&command)?;
        for e in &events {
            order.apply(e);
        }

        self.store.put_order(order.clone(), expected)?;
        self.publish_all(order.id_typed().0, "purchasing.order", order.version(), &events)?;
        Ok(order)
    }

    /// Publish committed events as JSON envelopes, sequenced by the source
    /// aggregate's post-commit version.
    fn publish_all<E>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        last_version: u64,
        events: &[E],
    ) -> Result<(), LedgerError>
    where
        E: Event + Serialize,
    {
        let base = last_version + 1 - events.len() as u64;
        for (i, event) in events.iter().enumerate() {
            let payload = serde_json::to_value(event).map_err(|e| {
                LedgerError::Publish(format!("payload serialization failed: {e}"))
            })?;
            let envelope = EventEnvelope::new(
                Uuid::now_v7(),
                aggregate_id,
                aggregate_type,
                base + i as u64,
                payload,
            );
            self.bus
                .publish(envelope)
                .map_err(|e| LedgerError::Publish(format!("{e:?}")))?;
        }
        Ok(())
    }
}
