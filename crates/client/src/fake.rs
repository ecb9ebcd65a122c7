//! In-memory [`Backend`] used by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use medstock_core::{AggregateId, ProductId};
use medstock_purchasing::{AuditTrail, PurchaseOrderId, PurchaseOrderStatus, SupplierId};
use medstock_quarantine::{QuarantineRecordId, QuarantineStatus, QuarantineSummary};

use crate::api::Backend;
use crate::dto::{
    PurchaseOrderView, QuarantineActionRequest, QuarantineRecordView, StatusUpdateRequest,
};
use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListOrders,
    GetOrder(PurchaseOrderId),
    UpdateStatus {
        id: PurchaseOrderId,
        status: PurchaseOrderStatus,
        comments: Option<String>,
    },
    ListRecords,
    GetRecord(QuarantineRecordId),
    SubmitAction(QuarantineActionRequest),
    Summary,
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Rejected(u16, &'static str),
    Transport,
}

#[derive(Default)]
struct State {
    orders: Vec<PurchaseOrderView>,
    records: Vec<QuarantineRecordView>,
    calls: Vec<Call>,
    failures: VecDeque<Failure>,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn add_order(&self, status: PurchaseOrderStatus) -> PurchaseOrderId {
        let id = PurchaseOrderId::new(AggregateId::new());
        self.state.lock().unwrap().orders.push(PurchaseOrderView {
            id,
            order_number: None,
            status,
            supplier_id: SupplierId::new(AggregateId::new()),
            supplier_name: Some("Acme Pharma".to_string()),
            lines: Vec::new(),
            audit: AuditTrail::default(),
        });
        id
    }

    pub fn add_record(&self, status: QuarantineStatus) -> QuarantineRecordId {
        let id = QuarantineRecordId::new(AggregateId::new());
        self.state.lock().unwrap().records.push(QuarantineRecordView {
            id,
            status,
            product_id: ProductId::new(),
            product_name: Some("Amoxicillin 500mg".to_string()),
            batch_number: "LOT-42".to_string(),
            quantity: 12,
            reason: "expired".to_string(),
            estimated_loss: 4_500,
            quarantined_at: Utc::now(),
            updated_at: None,
        });
        id
    }

    /// Change a record behind the screen's back, as another user would.
    pub fn set_record_status(&self, id: QuarantineRecordId, status: QuarantineStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(record) = state.records.iter_mut().find(|r| r.id == id) {
            record.status = status;
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Make the next backend call fail.
    pub fn fail_next(&self, failure: Failure) {
        self.state.lock().unwrap().failures.push_back(failure);
    }

    fn track(&self, call: Call) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match state.failures.pop_front() {
            None => Ok(()),
            Some(Failure::Rejected(status, message)) => Err(ClientError::Rejected {
                status,
                message: message.to_string(),
            }),
            Some(Failure::Transport) => Err(ClientError::Transport("connection reset".to_string())),
        }
    }
}

fn not_found() -> ClientError {
    ClientError::Rejected {
        status: 404,
        message: "not found".to_string(),
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_purchase_orders(&self) -> Result<Vec<PurchaseOrderView>, ClientError> {
        self.track(Call::ListOrders)?;
        Ok(self.state.lock().unwrap().orders.clone())
    }

    async fn get_purchase_order(
        &self,
        id: PurchaseOrderId,
    ) -> Result<PurchaseOrderView, ClientError> {
        self.track(Call::GetOrder(id))?;
        let state = self.state.lock().unwrap();
        state.orders.iter().find(|o| o.id == id).cloned().ok_or_else(not_found)
    }

    async fn update_purchase_order_status(
        &self,
        id: PurchaseOrderId,
        request: &StatusUpdateRequest,
    ) -> Result<PurchaseOrderView, ClientError> {
        self.track(Call::UpdateStatus {
            id,
            status: request.status,
            comments: request.comments.clone(),
        })?;
        let mut state = self.state.lock().unwrap();
        let order = state.orders.iter_mut().find(|o| o.id == id).ok_or_else(not_found)?;
        order.status = request.status;
        if request.comments.is_some() {
            order.audit.comments = request.comments.clone();
        }
        Ok(order.clone())
    }

    async fn list_quarantine_records(&self) -> Result<Vec<QuarantineRecordView>, ClientError> {
        self.track(Call::ListRecords)?;
        Ok(self.state.lock().unwrap().records.clone())
    }

    async fn get_quarantine_record(
        &self,
        id: QuarantineRecordId,
    ) -> Result<QuarantineRecordView, ClientError> {
        self.track(Call::GetRecord(id))?;
        let state = self.state.lock().unwrap();
        state.records.iter().find(|r| r.id == id).cloned().ok_or_else(not_found)
    }

    async fn submit_quarantine_action(
        &self,
        request: &QuarantineActionRequest,
    ) -> Result<QuarantineRecordView, ClientError> {
        self.track(Call::SubmitAction(request.clone()))?;
        let mut state = self.state.lock().unwrap();
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == request.quarantine_record_id)
            .ok_or_else(not_found)?;
        record.status = request.action.resulting_status();
        record.updated_at = Some(Utc::now());
        Ok(record.clone())
    }

    async fn quarantine_summary(&self) -> Result<QuarantineSummary, ClientError> {
        self.track(Call::Summary)?;
        let state = self.state.lock().unwrap();
        Ok(QuarantineSummary::from_records(
            state.records.iter().map(|r| (r.status, r.estimated_loss)),
        ))
    }
}
