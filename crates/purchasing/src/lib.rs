//! Purchasing domain module (purchase orders).
//!
//! Holds the purchase order status machine, line pricing and the order
//! aggregate. Pure domain logic: no IO, no HTTP, no storage.

pub mod order;
pub mod pricing;
pub mod status;

pub use order::{
    AddLine, AuditTrail, ChangeStatus, CreatePurchaseOrder, PurchaseOrder, PurchaseOrderCommand,
    PurchaseOrderCreated, PurchaseOrderEvent, PurchaseOrderId, PurchaseOrderLineAdded,
    PurchaseOrderRejected, PurchaseOrderStatusChanged, RejectApproval, SupplierId,
    validate_rejection_comments,
};
pub use pricing::{LineAmounts, LineItem, OrderTotals, MAX_BASIS_POINTS};
pub use status::{PURCHASE_ORDER_TRANSITIONS, PurchaseOrderStatus};
