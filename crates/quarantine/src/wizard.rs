//! Five-step review wizard for records under review.
//!
//! Each step has a completion predicate; `next` refuses to advance past an
//! incomplete step, `back` always works and keeps everything entered, and
//! `submit` re-checks all five predicates before producing the approval.

use serde::{Deserialize, Serialize};

use medstock_core::DomainError;

use crate::record::{ActionDetails, Attestations, QuarantineRecordId};
use crate::status::{Decision, QuarantineAction, QuarantineStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WizardStep {
    ReviewInformation,
    RiskAssessment,
    Decision,
    Documentation,
    FinalApproval,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::ReviewInformation,
        WizardStep::RiskAssessment,
        WizardStep::Decision,
        WizardStep::Documentation,
        WizardStep::FinalApproval,
    ];

    /// 1-based position.
    pub fn number(self) -> usize {
        self as usize + 1
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::ReviewInformation => "Review Information",
            WizardStep::RiskAssessment => "Risk Assessment",
            WizardStep::Decision => "Decision",
            WizardStep::Documentation => "Documentation",
            WizardStep::FinalApproval => "Final Approval",
        }
    }

    fn following(self) -> Option<WizardStep> {
        WizardStep::ALL.get(self.number()).copied()
    }

    fn preceding(self) -> Option<WizardStep> {
        (self as usize)
            .checked_sub(1)
            .and_then(|i| WizardStep::ALL.get(i).copied())
    }
}

/// Everything the reviewer has entered so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewForm {
    pub review_notes: String,
    pub risk_assessment: String,
    pub decision: Option<Decision>,
    pub disposal_method: String,
    pub disposal_justification: String,
    pub return_justification: String,
    pub supplier_notified: bool,
    pub compliance_checked: bool,
    pub manager_approved: bool,
}

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

impl ReviewForm {
    /// Why `step` is not complete yet, if it isn't.
    pub fn step_problem(&self, step: WizardStep) -> Option<&'static str> {
        match step {
            WizardStep::ReviewInformation => {
                (!filled(&self.review_notes)).then_some("review notes are required")
            }
            WizardStep::RiskAssessment => {
                (!filled(&self.risk_assessment)).then_some("risk assessment is required")
            }
            WizardStep::Decision => self
                .decision
                .is_none()
                .then_some("choose disposal or return"),
            WizardStep::Documentation => match self.decision {
                None => Some("choose disposal or return"),
                Some(Decision::Disposal) if !filled(&self.disposal_method) => {
                    Some("disposal method is required")
                }
                Some(Decision::Disposal) if !filled(&self.disposal_justification) => {
                    Some("disposal justification is required")
                }
                Some(Decision::Return) if !filled(&self.return_justification) => {
                    Some("return justification is required")
                }
                Some(Decision::Return) if !self.supplier_notified => {
                    Some("confirm the supplier has been notified")
                }
                Some(_) => None,
            },
            WizardStep::FinalApproval => {
                if !self.compliance_checked {
                    Some("confirm the compliance check")
                } else if !self.manager_approved {
                    Some("confirm manager approval authority")
                } else {
                    None
                }
            }
        }
    }

    pub fn step_complete(&self, step: WizardStep) -> bool {
        self.step_problem(step).is_none()
    }

    fn attestations(&self) -> Attestations {
        Attestations {
            compliance_checked: self.compliance_checked,
            manager_approved: self.manager_approved,
        }
    }

    fn comments(&self) -> String {
        format!(
            "{}\n\nRisk assessment: {}",
            self.review_notes.trim(),
            self.risk_assessment.trim()
        )
    }
}

/// The approval produced by a completed wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSubmission {
    pub record_id: QuarantineRecordId,
    pub action: QuarantineAction,
    pub details: ActionDetails,
    pub attestations: Attestations,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewWizard {
    record_id: QuarantineRecordId,
    step: WizardStep,
    form: ReviewForm,
}

impl ReviewWizard {
    /// Open the wizard for a record. Only records under review take a decision.
    pub fn open(record_id: QuarantineRecordId, status: QuarantineStatus) -> Result<Self, DomainError> {
        if !status.actions().iter().any(|a| a.is_approval()) {
            return Err(DomainError::invariant(format!(
                "records in {status} cannot be approved"
            )));
        }
        Ok(Self {
            record_id,
            step: WizardStep::ReviewInformation,
            form: ReviewForm::default(),
        })
    }

    pub fn record_id(&self) -> QuarantineRecordId {
        self.record_id
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn form(&self) -> &ReviewForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ReviewForm {
        &mut self.form
    }

    /// Advance one step if the current one is complete.
    pub fn next(&mut self) -> Result<WizardStep, DomainError> {
        if let Some(problem) = self.form.step_problem(self.step) {
            return Err(DomainError::validation(format!(
                "step {} ({}): {problem}",
                self.step.number(),
                self.step.title()
            )));
        }
        if let Some(next) = self.step.following() {
            self.step = next;
        }
        Ok(self.step)
    }

    /// Go back one step. Entered data is kept.
    pub fn back(&mut self) -> WizardStep {
        if let Some(prev) = self.step.preceding() {
            self.step = prev;
        }
        self.step
    }

    /// First step whose predicate does not hold.
    pub fn first_incomplete(&self) -> Option<WizardStep> {
        WizardStep::ALL
            .into_iter()
            .find(|step| !self.form.step_complete(*step))
    }

    pub fn can_submit(&self) -> bool {
        self.first_incomplete().is_none()
    }

    /// Build the approval request. Fails unless all five steps are complete.
    pub fn submit(&self) -> Result<ApprovalSubmission, DomainError> {
        if let Some(step) = self.first_incomplete() {
            let problem = self.form.step_problem(step).unwrap_or("incomplete");
            return Err(DomainError::validation(format!(
                "step {} ({}): {problem}",
                step.number(),
                step.title()
            )));
        }
        let decision = self
            .form
            .decision
            .ok_or_else(|| DomainError::validation("choose disposal or return"))?;

        let form = &self.form;
        let mut details = ActionDetails {
            comments: Some(form.comments()),
            ..ActionDetails::default()
        };
        match decision {
            Decision::Disposal => {
                details.disposal_method = Some(form.disposal_method.trim().to_string());
                details.disposal_justification =
                    Some(form.disposal_justification.trim().to_string());
            }
            Decision::Return => {
                details.return_justification = Some(form.return_justification.trim().to_string());
                details.supplier_notified = Some(true);
            }
        }

        Ok(ApprovalSubmission {
            record_id: self.record_id,
            action: decision.action(),
            details,
            attestations: form.attestations(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::validate_action_details;
    use medstock_core::AggregateId;
    use proptest::prelude::*;

    fn wizard() -> ReviewWizard {
        ReviewWizard::open(
            QuarantineRecordId::new(AggregateId::new()),
            QuarantineStatus::UnderReview,
        )
        .unwrap()
    }

    fn complete_disposal(w: &mut ReviewWizard) {
        let form = w.form_mut();
        form.review_notes = "Vials discoloured on inspection".to_string();
        form.risk_assessment = "High: sterility cannot be assured".to_string();
        form.decision = Some(Decision::Disposal);
        form.disposal_method = "Incineration".to_string();
        form.disposal_justification = "Product integrity compromised".to_string();
        form.compliance_checked = true;
        form.manager_approved = true;
    }

    #[test]
    fn opens_only_for_records_under_review() {
        let id = QuarantineRecordId::new(AggregateId::new());
        assert!(ReviewWizard::open(id, QuarantineStatus::UnderReview).is_ok());
        for status in [
            QuarantineStatus::PendingReview,
            QuarantineStatus::ApprovedForDisposal,
            QuarantineStatus::Disposed,
            QuarantineStatus::Returned,
        ] {
            assert!(ReviewWizard::open(id, status).is_err(), "{status}");
        }
    }

    #[test]
    fn next_blocks_on_incomplete_step() {
        let mut w = wizard();
        let err = w.next().unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("step 1 (Review Information): review notes are required")
        );
        assert_eq!(w.step(), WizardStep::ReviewInformation);

        w.form_mut().review_notes = "ok".to_string();
        assert_eq!(w.next().unwrap(), WizardStep::RiskAssessment);
        assert!(w.next().is_err());
    }

    #[test]
    fn walks_all_steps_and_stays_on_last() {
        let mut w = wizard();
        complete_disposal(&mut w);
        for expected in &WizardStep::ALL[1..] {
            assert_eq!(w.next().unwrap(), *expected);
        }
        assert_eq!(w.next().unwrap(), WizardStep::FinalApproval);
    }

    #[test]
    fn back_keeps_entered_data() {
        let mut w = wizard();
        w.form_mut().review_notes = "seal broken".to_string();
        w.next().unwrap();
        w.form_mut().risk_assessment = "moderate".to_string();

        assert_eq!(w.back(), WizardStep::ReviewInformation);
        assert_eq!(w.back(), WizardStep::ReviewInformation);
        assert_eq!(w.form().review_notes, "seal broken");
        assert_eq!(w.form().risk_assessment, "moderate");
    }

    #[test]
    fn submit_requires_every_step() {
        let mut w = wizard();
        complete_disposal(&mut w);
        assert!(w.can_submit());

        w.form_mut().manager_approved = false;
        assert!(!w.can_submit());
        assert_eq!(w.first_incomplete(), Some(WizardStep::FinalApproval));
        assert!(w.submit().is_err());

        w.form_mut().manager_approved = true;
        w.form_mut().review_notes.clear();
        assert_eq!(w.first_incomplete(), Some(WizardStep::ReviewInformation));
        assert!(w.submit().is_err());
    }

    #[test]
    fn disposal_without_method_or_justification_is_rejected() {
        let mut w = wizard();
        complete_disposal(&mut w);
        w.form_mut().disposal_method = String::new();
        assert!(w.submit().is_err());

        complete_disposal(&mut w);
        w.form_mut().disposal_justification = "   ".to_string();
        let err = w.submit().unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("disposal justification")));
    }

    #[test]
    fn return_requires_justification_and_notified_supplier() {
        let mut w = wizard();
        complete_disposal(&mut w);
        w.form_mut().decision = Some(Decision::Return);
        w.form_mut().return_justification = "Manufacturer recall".to_string();
        assert!(w.submit().is_err(), "supplier not yet notified");

        w.form_mut().supplier_notified = true;
        let submission = w.submit().unwrap();
        assert_eq!(submission.action, QuarantineAction::ApproveReturn);
        assert_eq!(submission.details.supplier_notified, Some(true));
        assert!(submission.details.disposal_method.is_none());

        w.form_mut().return_justification.clear();
        assert!(w.submit().is_err());
    }

    #[test]
    fn disposal_submission_carries_comments_and_justification() {
        let mut w = wizard();
        complete_disposal(&mut w);
        let submission = w.submit().unwrap();

        assert_eq!(submission.action, QuarantineAction::ApproveDisposal);
        let comments = submission.details.comments.as_deref().unwrap();
        assert!(comments.contains("Vials discoloured on inspection"));
        assert!(comments.contains("sterility cannot be assured"));
        assert_eq!(
            submission.details.disposal_justification.as_deref(),
            Some("Product integrity compromised")
        );
        assert!(submission.attestations.complete());
        assert!(validate_action_details(submission.action, &submission.details).is_ok());
    }

    fn any_text() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["", "   ", "checked"]).prop_map(str::to_string)
    }

    fn any_form() -> impl Strategy<Value = ReviewForm> {
        (
            (any_text(), any_text(), any_text(), any_text(), any_text()),
            prop::option::of(prop::sample::select(vec![Decision::Disposal, Decision::Return])),
            (any::<bool>(), any::<bool>(), any::<bool>()),
        )
            .prop_map(
                |(
                    (
                        review_notes,
                        risk_assessment,
                        disposal_method,
                        disposal_justification,
                        return_justification,
                    ),
                    decision,
                    (supplier_notified, compliance_checked, manager_approved),
                )| ReviewForm {
                    review_notes,
                    risk_assessment,
                    decision,
                    disposal_method,
                    disposal_justification,
                    return_justification,
                    supplier_notified,
                    compliance_checked,
                    manager_approved,
                },
            )
    }

    proptest! {
        /// Property: submission succeeds exactly when every step is complete,
        /// and a successful one always passes the action's field checks.
        #[test]
        fn submit_succeeds_iff_every_step_is_complete(form in any_form()) {
            let mut w = wizard();
            *w.form_mut() = form.clone();

            let all_complete = WizardStep::ALL.iter().all(|step| form.step_complete(*step));
            let result = w.submit();
            prop_assert_eq!(result.is_ok(), all_complete);
            prop_assert_eq!(w.can_submit(), all_complete);
            if let Ok(submission) = result {
                prop_assert!(validate_action_details(submission.action, &submission.details).is_ok());
                prop_assert!(submission.attestations.complete());
            }
        }
    }
}
