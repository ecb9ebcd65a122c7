use std::sync::Arc;

use chrono::Utc;
use medstock_core::Aggregate;
use medstock_events::Event;
use medstock_quarantine::{
    ActionDetails, ApplyAction, Attestations, QUARANTINE_ACTIONS, QuarantineAction,
    QuarantineCommand, QuarantineEvent, QuarantineRecord, QuarantineRecordId, ReviewWizard,
};

use crate::api::Backend;
use crate::dto::{QuarantineActionRequest, QuarantineRecordView};
use crate::error::{Alert, ClientError};

/// Run `action` through the record aggregate and turn the event it would
/// record into the request body.
fn action_request(
    record: &QuarantineRecord,
    action: QuarantineAction,
    details: ActionDetails,
    attestations: Attestations,
) -> Result<QuarantineActionRequest, ClientError> {
    let command = QuarantineCommand::ApplyAction(ApplyAction {
        record_id: record.id_typed(),
        action,
        details,
        attestations,
        performed_by: None,
        occurred_at: Utc::now(),
    });
    let events = record.handle(&command)?;
    for event in &events {
        tracing::debug!(audit = %event.audit_line(), "quarantine action accepted locally");
    }
    match events.as_slice() {
        [QuarantineEvent::QuarantineActionApplied(e)] => Ok(QuarantineActionRequest {
            quarantine_record_id: e.record_id,
            action: e.action,
            details: e.details.clone(),
        }),
        other => Err(ClientError::validation(format!(
            "unexpected outcome for a quarantine action: {other:?}"
        ))),
    }
}

/// Dialog for the non-approval actions (review, dispose, return).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDialog {
    pub record_id: QuarantineRecordId,
    pub action: QuarantineAction,
    pub details: ActionDetails,
    pub inline_error: Option<String>,
    pub alert: Option<Alert>,
    record: QuarantineRecord,
}

impl ActionDialog {
    /// Keep only the fields this action collects, trimmed, blanks dropped.
    fn request(&self) -> Result<QuarantineActionRequest, ClientError> {
        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        let mut details = ActionDetails {
            comments: clean(&self.details.comments),
            ..ActionDetails::default()
        };
        match self.action {
            QuarantineAction::Dispose => {
                details.disposal_method = clean(&self.details.disposal_method);
                details.disposal_certificate = clean(&self.details.disposal_certificate);
            }
            QuarantineAction::Return => {
                details.return_reference = clean(&self.details.return_reference);
            }
            _ => {}
        }
        action_request(&self.record, self.action, details, Attestations::default())
    }
}

pub struct QuarantineScreen {
    backend: Arc<dyn Backend>,
    records: Vec<QuarantineRecordView>,
    dialog: Option<ActionDialog>,
    wizard: Option<ReviewWizard>,
    /// Why the last wizard submission was refused locally.
    review_error: Option<String>,
    alert: Option<Alert>,
}

impl QuarantineScreen {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            records: Vec::new(),
            dialog: None,
            wizard: None,
            review_error: None,
            alert: None,
        }
    }

    pub fn records(&self) -> &[QuarantineRecordView] {
        &self.records
    }

    pub fn record(&self, id: QuarantineRecordId) -> Option<&QuarantineRecordView> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn dialog(&self) -> Option<&ActionDialog> {
        self.dialog.as_ref()
    }

    pub fn dialog_mut(&mut self) -> Option<&mut ActionDialog> {
        self.dialog.as_mut()
    }

    pub fn wizard(&self) -> Option<&ReviewWizard> {
        self.wizard.as_ref()
    }

    pub fn wizard_mut(&mut self) -> Option<&mut ReviewWizard> {
        self.wizard.as_mut()
    }

    pub fn review_error(&self) -> Option<&str> {
        self.review_error.as_deref()
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

    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        match self.backend.list_quarantine_records().await {
            Ok(records) => {
                tracing::debug!(count = records.len(), "quarantine records loaded");
                self.records = records;
                Ok(())
            }
            Err(e) => {
                self.alert = Some(Alert::from(&e));
                Err(e)
            }
        }
    }

    pub fn offered_actions(&self, id: QuarantineRecordId) -> &'static [QuarantineAction] {
        self.record(id)
            .map(QuarantineRecordView::available_actions)
            .unwrap_or(&[])
    }

    fn aggregate(&self, id: QuarantineRecordId) -> Result<QuarantineRecord, ClientError> {
        self.record(id)
            .map(QuarantineRecordView::to_aggregate)
            .ok_or_else(|| ClientError::validation(format!("quarantine record {id} is not loaded")))
    }

    /// Open the dialog for a review, dispose or return action.
    pub fn open_action(
        &mut self,
        id: QuarantineRecordId,
        action: QuarantineAction,
    ) -> Result<&mut ActionDialog, ClientError> {
        let record = self.aggregate(id)?;
        QUARANTINE_ACTIONS.check(record.status(), action)?;
        if action.is_approval() {
            return Err(ClientError::validation(
                "approvals are submitted through the review wizard",
            ));
        }
        Ok(self.dialog.insert(ActionDialog {
            record_id: id,
            action,
            details: ActionDetails::default(),
            inline_error: None,
            alert: None,
            record,
        }))
    }

    pub fn close_dialog(&mut self) {
        self.dialog = None;
    }

    /// Submit the open action dialog. Same failure handling as purchase
    /// order status changes: inline for local problems, alert on the dialog
    /// otherwise; re-fetch on success.
    pub async fn submit_action(&mut self) -> Result<QuarantineRecordView, ClientError> {
        let dialog = self
            .dialog
            .as_mut()
            .ok_or_else(|| ClientError::validation("no action in progress"))?;

        let request = match dialog.request() {
            Ok(request) => request,
            Err(e) => {
                tracing::info!(record_id = %dialog.record_id, error = %e, "quarantine action blocked locally");
                dialog.inline_error = Some(e.alert_text());
                return Err(e);
            }
        };
        dialog.inline_error = None;
        dialog.alert = None;

        match self.backend.submit_quarantine_action(&request).await {
            Ok(updated) => {
                self.dialog = None;
                self.after_mutation(&updated).await;
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

    /// Start the review wizard for a record under review.
    pub fn open_review(&mut self, id: QuarantineRecordId) -> Result<&mut ReviewWizard, ClientError> {
        let record = self.aggregate(id)?;
        let wizard = ReviewWizard::open(id, record.status())?;
        self.review_error = None;
        Ok(self.wizard.insert(wizard))
    }

    pub fn close_review(&mut self) {
        self.wizard = None;
        self.review_error = None;
    }

    /// Submit the wizard's approval. Nothing is sent unless all five steps
    /// are complete; exactly one action request is sent otherwise. A local
    /// refusal is kept in `review_error` with the wizard left open.
    pub async fn submit_review(&mut self) -> Result<QuarantineRecordView, ClientError> {
        let request = match self.review_request() {
            Ok(request) => request,
            Err(e) => {
                tracing::info!(error = %e, "review submission blocked locally");
                if self.wizard.is_some() {
                    self.review_error = Some(e.alert_text());
                }
                return Err(e);
            }
        };
        self.review_error = None;

        match self.backend.submit_quarantine_action(&request).await {
            Ok(updated) => {
                self.wizard = None;
                self.after_mutation(&updated).await;
                Ok(updated)
            }
            Err(e) => {
                self.alert = Some(Alert::from(&e));
                Err(e)
            }
        }
    }

    fn review_request(&self) -> Result<QuarantineActionRequest, ClientError> {
        let wizard = self
            .wizard
            .as_ref()
            .ok_or_else(|| ClientError::validation("no review in progress"))?;
        let submission = wizard.submit()?;
        let record = self.aggregate(submission.record_id)?;
        action_request(
            &record,
            submission.action,
            submission.details,
            submission.attestations,
        )
    }

    async fn after_mutation(&mut self, updated: &QuarantineRecordView) {
        tracing::info!(record_id = %updated.id, status = %updated.status, "quarantine record updated");
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "refresh after quarantine action failed");
        }
    }
}
