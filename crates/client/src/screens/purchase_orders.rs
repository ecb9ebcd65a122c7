use std::sync::Arc;

use chrono::Utc;
use medstock_core::Aggregate;
use medstock_events::Event;
use medstock_purchasing::{
    ChangeStatus, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderEvent, PurchaseOrderId,
    PurchaseOrderStatus, RejectApproval,
};

use crate::api::Backend;
use crate::dto::{PurchaseOrderView, StatusUpdateRequest};
use crate::error::{Alert, ClientError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDialogKind {
    /// Move one step along the lifecycle.
    Transition(PurchaseOrderStatus),
    /// Reject a draft awaiting approval; comments are mandatory.
    RejectApproval,
}

/// Confirmation dialog for a status change.
///
/// Holds the order as last fetched; confirming runs the command through the
/// aggregate and sends what it would record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDialog {
    pub order_id: PurchaseOrderId,
    pub kind: StatusDialogKind,
    pub comments: String,
    /// Local validation message shown next to the field.
    pub inline_error: Option<String>,
    /// Backend or transport failure; the dialog stays open.
    pub alert: Option<Alert>,
    order: PurchaseOrder,
}

impl StatusDialog {
    fn new(order: PurchaseOrder, kind: StatusDialogKind) -> Self {
        Self {
            order_id: order.id_typed(),
            kind,
            comments: String::new(),
            inline_error: None,
            alert: None,
            order,
        }
    }

    pub fn current(&self) -> PurchaseOrderStatus {
        self.order.status()
    }

    /// Status the order ends up in if confirmed. A rejected draft is cancelled.
    pub fn target(&self) -> PurchaseOrderStatus {
        match self.kind {
            StatusDialogKind::Transition(target) => target,
            StatusDialogKind::RejectApproval => PurchaseOrderStatus::Cancelled,
        }
    }

    fn command(&self) -> PurchaseOrderCommand {
        let order_id = self.order.id_typed();
        let occurred_at = Utc::now();
        match self.kind {
            StatusDialogKind::Transition(target) => PurchaseOrderCommand::ChangeStatus(ChangeStatus {
                order_id,
                target,
                changed_by: None,
                comments: Some(self.comments.clone()),
                occurred_at,
            }),
            StatusDialogKind::RejectApproval => PurchaseOrderCommand::RejectApproval(RejectApproval {
                order_id,
                rejected_by: None,
                comments: self.comments.clone(),
                occurred_at,
            }),
        }
    }

    fn request(&self) -> Result<StatusUpdateRequest, ClientError> {
        let events = self.order.handle(&self.command())?;
        for event in &events {
            tracing::debug!(audit = %event.audit_line(), "status change accepted locally");
        }
        match events.as_slice() {
            [PurchaseOrderEvent::PurchaseOrderStatusChanged(e)] => Ok(StatusUpdateRequest {
                status: e.to,
                comments: e.comments.clone(),
            }),
            [PurchaseOrderEvent::PurchaseOrderRejected(e)] => Ok(StatusUpdateRequest {
                status: PurchaseOrderStatus::Cancelled,
                comments: Some(e.comments.clone()),
            }),
            other => Err(ClientError::validation(format!(
                "unexpected outcome for a status change: {other:?}"
            ))),
        }
    }
}

pub struct PurchaseOrderScreen {
    backend: Arc<dyn Backend>,
    orders: Vec<PurchaseOrderView>,
    dialog: Option<StatusDialog>,
    alert: Option<Alert>,
}

impl PurchaseOrderScreen {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            orders: Vec::new(),
            dialog: None,
            alert: None,
        }
    }

    pub fn orders(&self) -> &[PurchaseOrderView] {
        &self.orders
    }

    pub fn order(&self, id: PurchaseOrderId) -> Option<&PurchaseOrderView> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub fn dialog(&self) -> Option<&StatusDialog> {
        self.dialog.as_ref()
    }

    pub fn dialog_mut(&mut self) -> Option<&mut StatusDialog> {
        self.dialog.as_mut()
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
        if let Some(dialog) = self.dialog.as_mut() {
            dialog.alert = None;
        }
    }

    /// Re-fetch the order list.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        match self.backend.list_purchase_orders().await {
            Ok(orders) => {
                tracing::debug!(count = orders.len(), "purchase orders loaded");
                self.orders = orders;
                Ok(())
            }
            Err(e) => {
                self.alert = Some(Alert::from(&e));
                Err(e)
            }
        }
    }

    /// Transitions offered for an order; anything else is disabled.
    pub fn offered_transitions(&self, id: PurchaseOrderId) -> &'static [PurchaseOrderStatus] {
        self.order(id)
            .map(PurchaseOrderView::available_transitions)
            .unwrap_or(&[])
    }

    fn aggregate(&self, id: PurchaseOrderId) -> Result<PurchaseOrder, ClientError> {
        self.order(id)
            .map(PurchaseOrderView::to_aggregate)
            .ok_or_else(|| ClientError::validation(format!("purchase order {id} is not loaded")))
    }

    /// Opens only if the aggregate accepts the transition from the order's
    /// current status.
    pub fn open_transition(
        &mut self,
        id: PurchaseOrderId,
        target: PurchaseOrderStatus,
    ) -> Result<&mut StatusDialog, ClientError> {
        let dialog = StatusDialog::new(self.aggregate(id)?, StatusDialogKind::Transition(target));
        dialog.request()?;
        Ok(self.dialog.insert(dialog))
    }

    pub fn open_rejection(&mut self, id: PurchaseOrderId) -> Result<&mut StatusDialog, ClientError> {
        let order = self.aggregate(id)?;
        if !order.can_reject() {
            return Err(ClientError::validation(format!(
                "only draft orders awaiting approval can be rejected (order is {})",
                order.status()
            )));
        }
        Ok(self.dialog.insert(StatusDialog::new(order, StatusDialogKind::RejectApproval)))
    }

    pub fn close_dialog(&mut self) {
        self.dialog = None;
    }

    /// Confirm the open dialog.
    ///
    /// Local validation failures stay inline and make no request. Backend and
    /// transport failures are attached to the dialog, which stays open. On
    /// success the dialog closes and the list is re-fetched.
    pub async fn confirm(&mut self) -> Result<PurchaseOrderView, ClientError> {
        let dialog = self
            .dialog
            .as_mut()
            .ok_or_else(|| ClientError::validation("no status change in progress"))?;

        let request = match dialog.request() {
            Ok(request) => request,
            Err(e) => {
                tracing::info!(order_id = %dialog.order_id, error = %e, "status change blocked locally");
                dialog.inline_error = Some(e.alert_text());
                return Err(e);
            }
        };
        dialog.inline_error = None;
        dialog.alert = None;
        let order_id = dialog.order_id;

        match self
            .backend
            .update_purchase_order_status(order_id, &request)
            .await
        {
            Ok(updated) => {
                tracing::info!(order_id = %order_id, status = %updated.status, "purchase order status changed");
                self.dialog = None;
                if let Err(e) = self.refresh().await {
                    tracing::warn!(error = %e, "refresh after status change failed");
                }
                Ok(updated)
            }
            Err(e) => {
                if let Some(dialog) = self.dialog.as_mut() {
                    dialog.alert = Some(Alert::from(&e));
                }
                Err(e)
            }
        }
    }
}
