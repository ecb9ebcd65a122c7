//! Quarantine domain module.
//!
//! Quarantined batches move through review, an approval decision (disposal or
//! return to supplier) and a final disposal/return. This crate holds the
//! status/action tables, the per-action field requirements, the five-step
//! review wizard and the dashboard summary. Pure domain logic, no IO.

pub mod record;
pub mod status;
pub mod summary;
pub mod wizard;

pub use record::{
    ActionDetails, ApplyAction, Attestations, BatchQuarantined, QuarantineActionApplied,
    QuarantineBatch, QuarantineCommand, QuarantineEvent, QuarantineRecord, QuarantineRecordId,
    validate_action_details,
};
pub use status::{Decision, QUARANTINE_ACTIONS, QuarantineAction, QuarantineStatus};
pub use summary::QuarantineSummary;
pub use wizard::{ApprovalSubmission, ReviewForm, ReviewWizard, WizardStep};
