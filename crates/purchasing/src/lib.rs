//! Purchasing domain module.
//!
//! Purchase orders are the administrative side of stock intake: each recorded
//! line receipt is turned into a `Receipt` stock transaction by the
//! application service, and received unit prices feed the catalog's price
//! history.

pub mod order;

pub use order::{
    AddOrderLine, CancelOrder, CreateOrder, LineReceived, MarkSent, OrderCancelled, OrderCompleted,
    OrderCreated, OrderLine, OrderLineAdded, OrderSent, PurchaseOrder, PurchaseOrderCommand,
    PurchaseOrderEvent, PurchaseOrderId, PurchaseOrderStatus, ReceiveLine,
};
