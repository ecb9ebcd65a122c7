//! Wire types exchanged with the REST backend (camelCase JSON).
//!
//! Read models are request-scoped copies of backend state; nothing here is
//! persisted locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medstock_core::{DomainError, ProductId};
use medstock_purchasing::{
    AuditTrail, LineItem, OrderTotals, PurchaseOrder, PurchaseOrderId, PurchaseOrderStatus,
    SupplierId,
};
use medstock_quarantine::{
    ActionDetails, BatchQuarantined, QuarantineAction, QuarantineRecord, QuarantineRecordId,
    QuarantineStatus,
};

/// Purchase order as returned by `GET /purchase-orders[/{id}]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderView {
    pub id: PurchaseOrderId,
    #[serde(default)]
    pub order_number: Option<String>,
    pub status: PurchaseOrderStatus,
    pub supplier_id: SupplierId,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub lines: Vec<LineItem>,
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl PurchaseOrderView {
    pub fn available_transitions(&self) -> &'static [PurchaseOrderStatus] {
        self.status.next()
    }

    pub fn totals(&self) -> Result<OrderTotals, DomainError> {
        OrderTotals::from_lines(&self.lines)
    }

    /// Aggregate at the reported state, used to judge a command before it
    /// is sent.
    pub fn to_aggregate(&self) -> PurchaseOrder {
        PurchaseOrder::restore(
            self.id,
            self.supplier_id,
            self.status,
            self.lines.clone(),
            self.audit.clone(),
        )
    }

    /// Order number if the backend assigned one, else the id.
    pub fn label(&self) -> String {
        self.order_number
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Quarantine record as returned by `GET /quarantine[/{id}]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantineRecordView {
    pub id: QuarantineRecordId,
    pub status: QuarantineStatus,
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: Option<String>,
    pub batch_number: String,
    pub quantity: i64,
    pub reason: String,
    #[serde(default)]
    pub estimated_loss: u64,
    pub quarantined_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl QuarantineRecordView {
    pub fn available_actions(&self) -> &'static [QuarantineAction] {
        self.status.actions()
    }

    pub fn to_aggregate(&self) -> QuarantineRecord {
        let batch = BatchQuarantined {
            record_id: self.id,
            product_id: self.product_id,
            batch_number: self.batch_number.clone(),
            quantity: self.quantity,
            reason: self.reason.clone(),
            estimated_loss: self.estimated_loss,
            occurred_at: self.quarantined_at,
        };
        QuarantineRecord::restore(
            &batch,
            self.status,
            self.updated_at.unwrap_or(self.quarantined_at),
        )
    }
}

/// Body of `PATCH /purchase-orders/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: PurchaseOrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// Body of `POST /quarantine/action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantineActionRequest {
    pub quarantine_record_id: QuarantineRecordId,
    pub action: QuarantineAction,
    #[serde(flatten)]
    pub details: ActionDetails,
}
