use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_catalog::ItemId;
use depot_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use depot_events::Event;

/// Purchase order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase order status lifecycle.
///
/// `Pending -> Sent -> Received -> Completed`, with `Cancelled` reachable
/// from `Pending` and `Sent` only. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Pending,
    Sent,
    Received,
    Completed,
    Cancelled,
}

/// Purchase order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_no: u32,
    pub item_id: ItemId,
    pub quantity: i64,
    /// Estimated unit price at ordering time (smallest currency unit).
    pub unit_price: u64,
    pub received_quantity: i64,
}

impl OrderLine {
    pub fn is_fully_received(&self) -> bool {
        self.received_quantity == self.quantity
    }

    pub fn outstanding(&self) -> i64 {
        self.quantity - self.received_quantity
    }
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    supplier: String,
    status: PurchaseOrderStatus,
    lines: Vec<OrderLine>,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            supplier: String::new(),
            status: PurchaseOrderStatus::Pending,
            lines: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn supplier(&self) -> &str {
        &self.supplier
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn line(&self, line_no: u32) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.line_no == line_no)
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub order_id: PurchaseOrderId,
    pub supplier: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddOrderLine (only allowed while Pending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOrderLine {
    pub order_id: PurchaseOrderId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub unit_price: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSent {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveLine (partial receipts allowed; over-receipt is not).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveLine {
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub quantity: i64,
    /// Actual unit price on the delivery note.
    pub unit_price: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder (only from Pending or Sent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    CreateOrder(CreateOrder),
    AddOrderLine(AddOrderLine),
    MarkSent(MarkSent),
    ReceiveLine(ReceiveLine),
    CancelOrder(CancelOrder),
}

/// Event: OrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: PurchaseOrderId,
    pub supplier: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderLineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineAdded {
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub item_id: ItemId,
    pub quantity: i64,
    pub unit_price: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSent {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineReceived.
///
/// The application service turns this into a `Receipt` stock transaction and,
/// when `unit_price` differs from the item's last purchase price, a catalog
/// price entry attributed to the order's supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineReceived {
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub item_id: ItemId,
    pub quantity: i64,
    pub unit_price: u64,
    pub supplier: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCompleted (every line fully received).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompleted {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    OrderCreated(OrderCreated),
    OrderLineAdded(OrderLineAdded),
    OrderSent(OrderSent),
    LineReceived(LineReceived),
    OrderCompleted(OrderCompleted),
    OrderCancelled(OrderCancelled),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::OrderCreated(_) => "purchasing.order.created",
            PurchaseOrderEvent::OrderLineAdded(_) => "purchasing.order.line_added",
            PurchaseOrderEvent::OrderSent(_) => "purchasing.order.sent",
            PurchaseOrderEvent::LineReceived(_) => "purchasing.order.line_received",
            PurchaseOrderEvent::OrderCompleted(_) => "purchasing.order.completed",
            PurchaseOrderEvent::OrderCancelled(_) => "purchasing.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::OrderCreated(e) => e.occurred_at,
            PurchaseOrderEvent::OrderLineAdded(e) => e.occurred_at,
            PurchaseOrderEvent::OrderSent(e) => e.occurred_at,
            PurchaseOrderEvent::LineReceived(e) => e.occurred_at,
            PurchaseOrderEvent::OrderCompleted(e) => e.occurred_at,
            PurchaseOrderEvent::OrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::OrderCreated(e) => {
                self.id = e.order_id;
                self.supplier = e.supplier.clone();
                self.status = PurchaseOrderStatus::Pending;
                self.lines.clear();
                self.created = true;
            }
            PurchaseOrderEvent::OrderLineAdded(e) => {
                self.lines.push(OrderLine {
                    line_no: e.line_no,
                    item_id: e.item_id,
                    quantity: e.quantity,
                    unit_price: e.unit_price,
                    received_quantity: 0,
                });
            }
            PurchaseOrderEvent::OrderSent(_) => {
                self.status = PurchaseOrderStatus::Sent;
            }
            PurchaseOrderEvent::LineReceived(e) => {
                if let Some(l) = self.lines.iter_mut().find(|l| l.line_no == e.line_no) {
                    l.received_quantity += e.quantity;
                }
                self.status = PurchaseOrderStatus::Received;
            }
            PurchaseOrderEvent::OrderCompleted(_) => {
                self.status = PurchaseOrderStatus::Completed;
            }
            PurchaseOrderEvent::OrderCancelled(_) => {
                self.status = PurchaseOrderStatus::Cancelled;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::CreateOrder(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::AddOrderLine(cmd) => self.handle_add_line(cmd),
            PurchaseOrderCommand::MarkSent(cmd) => self.handle_mark_sent(cmd),
            PurchaseOrderCommand::ReceiveLine(cmd) => self.handle_receive_line(cmd),
            PurchaseOrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl PurchaseOrder {
    fn ensure_order_id(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateOrder) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists"));
        }
        if cmd.supplier.trim().is_empty() {
            return Err(DomainError::validation("supplier cannot be empty"));
        }

        Ok(vec![PurchaseOrderEvent::OrderCreated(OrderCreated {
            order_id: cmd.order_id,
            supplier: cmd.supplier.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddOrderLine) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_order_id(cmd.order_id)?;

        if self.status != PurchaseOrderStatus::Pending {
            return Err(DomainError::invariant(
                "cannot modify purchase order once sent",
            ));
        }
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let next_line_no = (self.lines.len() as u32) + 1;
        Ok(vec![PurchaseOrderEvent::OrderLineAdded(OrderLineAdded {
            order_id: cmd.order_id,
            line_no: next_line_no,
            item_id: cmd.item_id,
            quantity: cmd.quantity,
            unit_price: cmd.unit_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_sent(&self, cmd: &MarkSent) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_order_id(cmd.order_id)?;

        if self.status != PurchaseOrderStatus::Pending {
            return Err(DomainError::invariant(
                "only pending purchase orders can be sent",
            ));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation(
                "cannot send purchase order without lines",
            ));
        }

        Ok(vec![PurchaseOrderEvent::OrderSent(OrderSent {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive_line(
        &self,
        cmd: &ReceiveLine,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_order_id(cmd.order_id)?;

        // Receipts start once the order is with the supplier.
        if !matches!(
            self.status,
            PurchaseOrderStatus::Sent | PurchaseOrderStatus::Received
        ) {
            return Err(DomainError::invariant(
                "can only receive against a sent purchase order",
            ));
        }
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let line = self.line(cmd.line_no).ok_or(DomainError::NotFound)?;
        if cmd.quantity > line.outstanding() {
            return Err(DomainError::validation(format!(
                "line {}: received {} exceeds outstanding {}",
                cmd.line_no,
                cmd.quantity,
                line.outstanding()
            )));
        }

        let mut events = vec![PurchaseOrderEvent::LineReceived(LineReceived {
            order_id: cmd.order_id,
            line_no: cmd.line_no,
            item_id: line.item_id,
            quantity: cmd.quantity,
            unit_price: cmd.unit_price,
            supplier: self.supplier.clone(),
            occurred_at: cmd.occurred_at,
        })];

        // Completed only when every line is fully received after this receipt.
        let all_received = self.lines.iter().all(|l| {
            if l.line_no == cmd.line_no {
                l.received_quantity + cmd.quantity == l.quantity
            } else {
                l.is_fully_received()
            }
        });
        if all_received {
            events.push(PurchaseOrderEvent::OrderCompleted(OrderCompleted {
                order_id: cmd.order_id,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_order_id(cmd.order_id)?;

        if !matches!(
            self.status,
            PurchaseOrderStatus::Pending | PurchaseOrderStatus::Sent
        ) {
            return Err(DomainError::invariant(
                "only pending or sent purchase orders can be cancelled",
            ));
        }

        Ok(vec![PurchaseOrderEvent::OrderCancelled(OrderCancelled {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_order_id() -> PurchaseOrderId {
        PurchaseOrderId::new(AggregateId::new())
    }

    fn test_item_id() -> ItemId {
        ItemId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn apply_all(order: &mut PurchaseOrder, events: &[PurchaseOrderEvent]) {
        for e in events {
            order.apply(e);
        }
    }

    fn sent_order(quantities: &[i64]) -> PurchaseOrder {
        let order_id = test_order_id();
        let mut order = PurchaseOrder::empty(order_id);

        let events = order
            .handle(&PurchaseOrderCommand::CreateOrder(CreateOrder {
                order_id,
                supplier: "Bosch".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut order, &events);

        for qty in quantities {
            let events = order
                .handle(&PurchaseOrderCommand::AddOrderLine(AddOrderLine {
                    order_id,
                    item_id: test_item_id(),
                    quantity: *qty,
                    unit_price: 1000,
                    occurred_at: test_time(),
                }))
                .unwrap();
            apply_all(&mut order, &events);
        }

        let events = order
            .handle(&PurchaseOrderCommand::MarkSent(MarkSent {
                order_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut order, &events);
        assert_eq!(order.status(), PurchaseOrderStatus::Sent);
        order
    }

    #[test]
    fn partial_receipt_moves_order_to_received() {
        let mut order = sent_order(&[10]);
        let order_id = order.id_typed();

        let events = order
            .handle(&PurchaseOrderCommand::ReceiveLine(ReceiveLine {
                order_id,
                line_no: 1,
                quantity: 4,
                unit_price: 1100,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(events.len(), 1);
        apply_all(&mut order, &events);

        assert_eq!(order.status(), PurchaseOrderStatus::Received);
        assert_eq!(order.line(1).unwrap().received_quantity, 4);
    }

    #[test]
    fn full_receipt_of_all_lines_completes_the_order() {
        let mut order = sent_order(&[10, 5]);
        let order_id = order.id_typed();

        let events = order
            .handle(&PurchaseOrderCommand::ReceiveLine(ReceiveLine {
                order_id,
                line_no: 1,
                quantity: 10,
                unit_price: 1000,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(events.len(), 1);
        apply_all(&mut order, &events);
        assert_eq!(order.status(), PurchaseOrderStatus::Received);

        let events = order
            .handle(&PurchaseOrderCommand::ReceiveLine(ReceiveLine {
                order_id,
                line_no: 2,
                quantity: 5,
                unit_price: 1000,
                occurred_at: test_time(),
            }))
            .unwrap();
        // The final receipt also completes the order.
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1],
            PurchaseOrderEvent::OrderCompleted(_)
        ));
        apply_all(&mut order, &events);
        assert_eq!(order.status(), PurchaseOrderStatus::Completed);
    }

    #[test]
    fn over_receipt_is_rejected() {
        let mut order = sent_order(&[10]);
        let order_id = order.id_typed();

        let events = order
            .handle(&PurchaseOrderCommand::ReceiveLine(ReceiveLine {
                order_id,
                line_no: 1,
                quantity: 8,
                unit_price: 1000,
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut order, &events);

        let err = order
            .handle(&PurchaseOrderCommand::ReceiveLine(ReceiveLine {
                order_id,
                line_no: 1,
                quantity: 3,
                unit_price: 1000,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("exceeds outstanding") => {}
            _ => panic!("Expected validation error for over-receipt"),
        }
    }

    #[test]
    fn cannot_receive_before_sending() {
        let order_id = test_order_id();
        let mut order = PurchaseOrder::empty(order_id);

        let events = order
            .handle(&PurchaseOrderCommand::CreateOrder(CreateOrder {
                order_id,
                supplier: "Bosch".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut order, &events);

        let events = order
            .handle(&PurchaseOrderCommand::AddOrderLine(AddOrderLine {
                order_id,
                item_id: test_item_id(),
                quantity: 10,
                unit_price: 1000,
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut order, &events);

        let err = order
            .handle(&PurchaseOrderCommand::ReceiveLine(ReceiveLine {
                order_id,
                line_no: 1,
                quantity: 1,
                unit_price: 1000,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn completed_and_cancelled_are_terminal() {
        let mut order = sent_order(&[2]);
        let order_id = order.id_typed();

        let events = order
            .handle(&PurchaseOrderCommand::ReceiveLine(ReceiveLine {
                order_id,
                line_no: 1,
                quantity: 2,
                unit_price: 1000,
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut order, &events);
        assert_eq!(order.status(), PurchaseOrderStatus::Completed);

        let err = order
            .handle(&PurchaseOrderCommand::CancelOrder(CancelOrder {
                order_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let mut cancelled = sent_order(&[2]);
        let cancelled_id = cancelled.id_typed();
        let events = cancelled
            .handle(&PurchaseOrderCommand::CancelOrder(CancelOrder {
                order_id: cancelled_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        apply_all(&mut cancelled, &events);
        assert_eq!(cancelled.status(), PurchaseOrderStatus::Cancelled);

        let err = cancelled
            .handle(&PurchaseOrderCommand::ReceiveLine(ReceiveLine {
                order_id: cancelled_id,
                line_no: 1,
                quantity: 1,
                unit_price: 1000,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn lines_cannot_be_added_after_sending() {
        let mut order = sent_order(&[1]);
        let order_id = order.id_typed();

        let err = order
            .handle(&PurchaseOrderCommand::AddOrderLine(AddOrderLine {
                order_id,
                item_id: test_item_id(),
                quantity: 5,
                unit_price: 500,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("once sent") => {}
            _ => panic!("Expected invariant violation when adding lines after send"),
        }
    }
}
