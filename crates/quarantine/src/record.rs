use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medstock_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ProductId, UserId};
use medstock_events::Event;

use crate::status::{QUARANTINE_ACTIONS, QuarantineAction, QuarantineStatus};

/// Quarantine record identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuarantineRecordId(pub AggregateId);

impl QuarantineRecordId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for QuarantineRecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Fields collected by an action dialog. Which ones are required depends on
/// the action; see [`validate_action_details`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposal_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposal_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposal_justification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_justification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_notified: Option<bool>,
}

/// The two sign-offs required before an approval is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestations {
    pub compliance_checked: bool,
    pub manager_approved: bool,
}

impl Attestations {
    pub fn complete(&self) -> bool {
        self.compliance_checked && self.manager_approved
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Check that `details` carries every field `action` requires.
pub fn validate_action_details(
    action: QuarantineAction,
    details: &ActionDetails,
) -> Result<(), DomainError> {
    match action {
        QuarantineAction::Review => Ok(()),
        QuarantineAction::ApproveDisposal => {
            if !present(&details.disposal_method) {
                return Err(DomainError::required("disposal method"));
            }
            if !present(&details.disposal_justification) {
                return Err(DomainError::required("disposal justification"));
            }
            Ok(())
        }
        QuarantineAction::ApproveReturn => {
            if !present(&details.return_justification) {
                return Err(DomainError::required("return justification"));
            }
            if details.supplier_notified != Some(true) {
                return Err(DomainError::validation(
                    "supplier must be notified before approving a return",
                ));
            }
            Ok(())
        }
        QuarantineAction::Dispose => {
            if !present(&details.disposal_method) {
                return Err(DomainError::required("disposal method"));
            }
            Ok(())
        }
        QuarantineAction::Return => {
            if !present(&details.return_reference) {
                return Err(DomainError::required("return reference"));
            }
            Ok(())
        }
    }
}

/// Aggregate root: QuarantineRecord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantineRecord {
    id: QuarantineRecordId,
    product_id: Option<ProductId>,
    batch_number: String,
    quantity: i64,
    reason: String,
    estimated_loss: u64,
    status: QuarantineStatus,
    documentation: ActionDetails,
    quarantined_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl QuarantineRecord {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: QuarantineRecordId) -> Self {
        Self {
            id,
            product_id: None,
            batch_number: String::new(),
            quantity: 0,
            reason: String::new(),
            estimated_loss: 0,
            status: QuarantineStatus::PendingReview,
            documentation: ActionDetails::default(),
            quarantined_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    /// Instance at the status the backend last reported for `batch`.
    /// Documentation from earlier steps is not part of the read model and
    /// starts empty.
    pub fn restore(
        batch: &BatchQuarantined,
        status: QuarantineStatus,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::empty(batch.record_id);
        record.apply(&QuarantineEvent::BatchQuarantined(batch.clone()));
        record.status = status;
        record.updated_at = Some(updated_at);
        record.version = 0;
        record
    }

    pub fn id_typed(&self) -> QuarantineRecordId {
        self.id
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn batch_number(&self) -> &str {
        &self.batch_number
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn estimated_loss(&self) -> u64 {
        self.estimated_loss
    }

    pub fn status(&self) -> QuarantineStatus {
        self.status
    }

    /// Documentation accumulated across approval and final action.
    pub fn documentation(&self) -> &ActionDetails {
        &self.documentation
    }

    pub fn quarantined_at(&self) -> Option<DateTime<Utc>> {
        self.quarantined_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn available_actions(&self) -> &'static [QuarantineAction] {
        if !self.created {
            return &[];
        }
        self.status.actions()
    }
}

impl AggregateRoot for QuarantineRecord {
    type Id = QuarantineRecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: QuarantineBatch (pull a batch from active stock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineBatch {
    pub record_id: QuarantineRecordId,
    pub product_id: ProductId,
    pub batch_number: String,
    pub quantity: i64,
    pub reason: String,
    pub estimated_loss: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApplyAction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyAction {
    pub record_id: QuarantineRecordId,
    pub action: QuarantineAction,
    pub details: ActionDetails,
    /// Only consulted for approvals.
    pub attestations: Attestations,
    /// `None` when the backend attributes the action from the bearer token.
    pub performed_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuarantineCommand {
    QuarantineBatch(QuarantineBatch),
    ApplyAction(ApplyAction),
}

/// Event: BatchQuarantined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchQuarantined {
    pub record_id: QuarantineRecordId,
    pub product_id: ProductId,
    pub batch_number: String,
    pub quantity: i64,
    pub reason: String,
    pub estimated_loss: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuarantineActionApplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineActionApplied {
    pub record_id: QuarantineRecordId,
    pub action: QuarantineAction,
    pub from: QuarantineStatus,
    pub to: QuarantineStatus,
    pub details: ActionDetails,
    pub performed_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuarantineEvent {
    BatchQuarantined(BatchQuarantined),
    QuarantineActionApplied(QuarantineActionApplied),
}

impl Event for QuarantineEvent {
    fn event_type(&self) -> &'static str {
        match self {
            QuarantineEvent::BatchQuarantined(_) => "quarantine.record.created",
            QuarantineEvent::QuarantineActionApplied(_) => "quarantine.record.action_applied",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            QuarantineEvent::BatchQuarantined(e) => e.occurred_at,
            QuarantineEvent::QuarantineActionApplied(e) => e.occurred_at,
        }
    }

    fn actor(&self) -> Option<UserId> {
        match self {
            QuarantineEvent::BatchQuarantined(_) => None,
            QuarantineEvent::QuarantineActionApplied(e) => e.performed_by,
        }
    }
}

/// Copy every field `incoming` carries over `current`.
fn merge_details(current: &mut ActionDetails, incoming: &ActionDetails) {
    fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
        if value.is_some() {
            *slot = value.clone();
        }
    }
    take(&mut current.comments, &incoming.comments);
    take(&mut current.disposal_method, &incoming.disposal_method);
    take(&mut current.disposal_certificate, &incoming.disposal_certificate);
    take(&mut current.disposal_justification, &incoming.disposal_justification);
    take(&mut current.return_reference, &incoming.return_reference);
    take(&mut current.return_justification, &incoming.return_justification);
    take(&mut current.supplier_notified, &incoming.supplier_notified);
}

impl Aggregate for QuarantineRecord {
    type Command = QuarantineCommand;
    type Event = QuarantineEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            QuarantineEvent::BatchQuarantined(e) => {
                self.id = e.record_id;
                self.product_id = Some(e.product_id);
                self.batch_number = e.batch_number.clone();
                self.quantity = e.quantity;
                self.reason = e.reason.clone();
                self.estimated_loss = e.estimated_loss;
                self.status = QuarantineStatus::PendingReview;
                self.documentation = ActionDetails::default();
                self.quarantined_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            QuarantineEvent::QuarantineActionApplied(e) => {
                self.status = e.to;
                merge_details(&mut self.documentation, &e.details);
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            QuarantineCommand::QuarantineBatch(cmd) => self.handle_quarantine(cmd),
            QuarantineCommand::ApplyAction(cmd) => self.handle_action(cmd),
        }
    }
}

impl QuarantineRecord {
    fn handle_quarantine(
        &self,
        cmd: &QuarantineBatch,
    ) -> Result<Vec<QuarantineEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("quarantine record already exists"));
        }
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quarantined quantity must be positive"));
        }
        if cmd.reason.trim().is_empty() {
            return Err(DomainError::required("quarantine reason"));
        }

        Ok(vec![QuarantineEvent::BatchQuarantined(BatchQuarantined {
            record_id: cmd.record_id,
            product_id: cmd.product_id,
            batch_number: cmd.batch_number.clone(),
            quantity: cmd.quantity,
            reason: cmd.reason.trim().to_string(),
            estimated_loss: cmd.estimated_loss,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_action(&self, cmd: &ApplyAction) -> Result<Vec<QuarantineEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != cmd.record_id {
            return Err(DomainError::invariant("record_id mismatch"));
        }

        QUARANTINE_ACTIONS.check(self.status, cmd.action)?;
        validate_action_details(cmd.action, &cmd.details)?;

        if cmd.action.is_approval() && !cmd.attestations.complete() {
            return Err(DomainError::validation(
                "compliance check and manager approval are both required",
            ));
        }

        Ok(vec![QuarantineEvent::QuarantineActionApplied(
            QuarantineActionApplied {
                record_id: cmd.record_id,
                action: cmd.action,
                from: self.status,
                to: cmd.action.resulting_status(),
                details: cmd.details.clone(),
                performed_by: cmd.performed_by,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
