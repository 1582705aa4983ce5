use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ValueObject};
use depot_events::Event;

/// Supplier recorded on a price entry when the update names none.
pub const UNSPECIFIED_SUPPLIER: &str = "unspecified";

/// Catalog item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub AggregateId);

impl ItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// One observed purchase price. Newest entries sit at the front of an item's
/// history; the history is append-only (entries are never edited or removed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub recorded_at: DateTime<Utc>,
    /// Price in the smallest currency unit (e.g. cents).
    pub price: u64,
    pub supplier: String,
}

impl ValueObject for PriceEntry {}

/// Aggregate root: catalog Item.
///
/// `stock` is evolved exclusively through [`StockAdjusted`] events decided by
/// the ledger's transaction planner; catalog commands never touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    code: String,
    name: String,
    category: String,
    subcategory: String,
    /// Unit of measure (e.g. "pcs", "l").
    unit: String,
    stock: i64,
    min_stock: i64,
    max_stock: i64,
    location: String,
    supplier: Option<String>,
    last_purchase_price: Option<u64>,
    price_history: Vec<PriceEntry>,
    retired: bool,
    version: u64,
    created: bool,
}

impl Item {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ItemId) -> Self {
        Self {
            id,
            code: String::new(),
            name: String::new(),
            category: String::new(),
            subcategory: String::new(),
            unit: String::new(),
            stock: 0,
            min_stock: 0,
            max_stock: 0,
            location: String::new(),
            supplier: None,
            last_purchase_price: None,
            price_history: Vec::new(),
            retired: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn subcategory(&self) -> &str {
        &self.subcategory
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn min_stock(&self) -> i64 {
        self.min_stock
    }

    pub fn max_stock(&self) -> i64 {
        self.max_stock
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn supplier(&self) -> Option<&str> {
        self.supplier.as_deref()
    }

    pub fn last_purchase_price(&self) -> Option<u64> {
        self.last_purchase_price
    }

    /// Price history, newest first. Empty if no price was ever recorded.
    pub fn price_history(&self) -> &[PriceEntry] {
        &self.price_history
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Reorder check: at or below the minimum threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Case-insensitive substring match over code, name, category and
    /// subcategory.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.code.to_lowercase().contains(&q)
            || self.name.to_lowercase().contains(&q)
            || self.category.to_lowercase().contains(&q)
            || self.subcategory.to_lowercase().contains(&q)
    }
}

impl AggregateRoot for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateItem.
///
/// Code uniqueness is catalog-wide and is enforced at the store boundary;
/// everything locally checkable (shape, thresholds) is validated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateItem {
    pub item_id: ItemId,
    pub code: String,
    pub name: String,
    pub category: String,
    pub subcategory: String,
    pub unit: String,
    pub min_stock: i64,
    pub max_stock: i64,
    pub location: String,
    pub supplier: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Partial update of item master data. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub unit: Option<String>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    pub location: Option<String>,
    pub supplier: Option<String>,
    pub last_purchase_price: Option<u64>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Command: UpdateItem (patch semantics).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItem {
    pub item_id: ItemId,
    pub patch: ItemPatch,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RetireItem (soft delete).
///
/// Retired items keep their identity and history so historical transactions
/// never dangle, but stop matching searches and reject new stock movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetireItem {
    pub item_id: ItemId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogCommand {
    CreateItem(CreateItem),
    UpdateItem(UpdateItem),
    RetireItem(RetireItem),
}

/// Event: ItemCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub item_id: ItemId,
    pub code: String,
    pub name: String,
    pub category: String,
    pub subcategory: String,
    pub unit: String,
    pub min_stock: i64,
    pub max_stock: i64,
    pub location: String,
    pub supplier: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdated {
    pub item_id: ItemId,
    pub patch: ItemPatch,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PriceRecorded.
///
/// Emitted alongside `ItemUpdated` whenever an update changes the last
/// purchase price. This is an observable side effect of the update, not a
/// mere field write: it prepends an entry to the append-only price history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecorded {
    pub item_id: ItemId,
    pub price: u64,
    pub supplier: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemRetired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRetired {
    pub item_id: ItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdjusted.
///
/// Decided by the ledger's transaction planner, never by a catalog command.
/// `reference` carries the human-readable transaction number that moved the
/// stock (e.g. "WD-2026-0007").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub item_id: ItemId,
    pub delta: i64,
    pub reference: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogEvent {
    ItemCreated(ItemCreated),
    ItemUpdated(ItemUpdated),
    PriceRecorded(PriceRecorded),
    ItemRetired(ItemRetired),
    StockAdjusted(StockAdjusted),
}

impl Event for CatalogEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::ItemCreated(_) => "catalog.item.created",
            CatalogEvent::ItemUpdated(_) => "catalog.item.updated",
            CatalogEvent::PriceRecorded(_) => "catalog.item.price_recorded",
            CatalogEvent::ItemRetired(_) => "catalog.item.retired",
            CatalogEvent::StockAdjusted(_) => "catalog.item.stock_adjusted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CatalogEvent::ItemCreated(e) => e.occurred_at,
            CatalogEvent::ItemUpdated(e) => e.occurred_at,
            CatalogEvent::PriceRecorded(e) => e.occurred_at,
            CatalogEvent::ItemRetired(e) => e.occurred_at,
            CatalogEvent::StockAdjusted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Item {
    type Command = CatalogCommand;
    type Event = CatalogEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CatalogEvent::ItemCreated(e) => {
                self.id = e.item_id;
                self.code = e.code.clone();
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.subcategory = e.subcategory.clone();
                self.unit = e.unit.clone();
                self.stock = 0;
                self.min_stock = e.min_stock;
                self.max_stock = e.max_stock;
                self.location = e.location.clone();
                self.supplier = e.supplier.clone();
                self.last_purchase_price = None;
                self.price_history.clear();
                self.retired = false;
                self.created = true;
            }
            CatalogEvent::ItemUpdated(e) => {
                let p = &e.patch;
                if let Some(name) = &p.name {
                    self.name = name.clone();
                }
                if let Some(category) = &p.category {
                    self.category = category.clone();
                }
                if let Some(subcategory) = &p.subcategory {
                    self.subcategory = subcategory.clone();
                }
                if let Some(unit) = &p.unit {
                    self.unit = unit.clone();
                }
                if let Some(min_stock) = p.min_stock {
                    self.min_stock = min_stock;
                }
                if let Some(max_stock) = p.max_stock {
                    self.max_stock = max_stock;
                }
                if let Some(location) = &p.location {
                    self.location = location.clone();
                }
                if let Some(supplier) = &p.supplier {
                    self.supplier = Some(supplier.clone());
                }
                // last_purchase_price is evolved by PriceRecorded.
            }
            CatalogEvent::PriceRecorded(e) => {
                self.last_purchase_price = Some(e.price);
                // Newest first.
                self.price_history.insert(
                    0,
                    PriceEntry {
                        recorded_at: e.occurred_at,
                        price: e.price,
                        supplier: e.supplier.clone(),
                    },
                );
            }
            CatalogEvent::ItemRetired(_) => {
                self.retired = true;
            }
            CatalogEvent::StockAdjusted(e) => {
                self.stock += e.delta;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CatalogCommand::CreateItem(cmd) => self.handle_create(cmd),
            CatalogCommand::UpdateItem(cmd) => self.handle_update(cmd),
            CatalogCommand::RetireItem(cmd) => self.handle_retire(cmd),
        }
    }
}

impl Item {
    fn ensure_item_id(&self, item_id: ItemId) -> Result<(), DomainError> {
        if self.id != item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        Ok(())
    }

    fn check_thresholds(min_stock: i64, max_stock: i64) -> Result<(), DomainError> {
        if min_stock < 0 {
            return Err(DomainError::validation("min_stock cannot be negative"));
        }
        if max_stock <= min_stock {
            return Err(DomainError::validation(
                "max_stock must be greater than min_stock",
            ));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateItem) -> Result<Vec<CatalogEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("item already exists"));
        }
        if cmd.code.trim().is_empty() {
            return Err(DomainError::validation("code cannot be empty"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Self::check_thresholds(cmd.min_stock, cmd.max_stock)?;

        Ok(vec![CatalogEvent::ItemCreated(ItemCreated {
            item_id: cmd.item_id,
            code: cmd.code.clone(),
            name: cmd.name.clone(),
            category: cmd.category.clone(),
            subcategory: cmd.subcategory.clone(),
            unit: cmd.unit.clone(),
            min_stock: cmd.min_stock,
            max_stock: cmd.max_stock,
            location: cmd.location.clone(),
            supplier: cmd.supplier.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateItem) -> Result<Vec<CatalogEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_item_id(cmd.item_id)?;

        if self.retired {
            return Err(DomainError::invariant("cannot update a retired item"));
        }
        if cmd.patch.is_empty() {
            return Err(DomainError::validation("patch contains no changes"));
        }
        if let Some(name) = &cmd.patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
        }

        // Thresholds are validated against the effective (merged) values, so
        // a rejected patch leaves the item unchanged.
        let min_stock = cmd.patch.min_stock.unwrap_or(self.min_stock);
        let max_stock = cmd.patch.max_stock.unwrap_or(self.max_stock);
        Self::check_thresholds(min_stock, max_stock)?;

        let mut events = vec![CatalogEvent::ItemUpdated(ItemUpdated {
            item_id: cmd.item_id,
            patch: cmd.patch.clone(),
            occurred_at: cmd.occurred_at,
        })];

        if let Some(price) = cmd.patch.last_purchase_price {
            if self.last_purchase_price != Some(price) {
                let supplier = cmd
                    .patch
                    .supplier
                    .clone()
                    .unwrap_or_else(|| UNSPECIFIED_SUPPLIER.to_string());
                events.push(CatalogEvent::PriceRecorded(PriceRecorded {
                    item_id: cmd.item_id,
                    price,
                    supplier,
                    occurred_at: cmd.occurred_at,
                }));
            }
        }

        Ok(events)
    }

    fn handle_retire(&self, cmd: &RetireItem) -> Result<Vec<CatalogEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_item_id(cmd.item_id)?;

        if self.retired {
            return Err(DomainError::invariant("item is already retired"));
        }

        Ok(vec![CatalogEvent::ItemRetired(ItemRetired {
            item_id: cmd.item_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
