//! Quarantine statuses, actions and the decision taken during review.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use medstock_core::{DomainError, TransitionTable};

/// Quarantine record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuarantineStatus {
    PendingReview,
    UnderReview,
    ApprovedForDisposal,
    ApprovedForReturn,
    Disposed,
    Returned,
}

/// Action a user can take on a quarantine record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuarantineAction {
    Review,
    ApproveDisposal,
    ApproveReturn,
    Dispose,
    Return,
}

/// Outcome chosen in the review wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Disposal,
    Return,
}

const ACTION_EDGES: &[(QuarantineStatus, &[QuarantineAction])] = {
    use QuarantineAction::*;
    use QuarantineStatus::*;
    &[
        (PendingReview, &[Review]),
        (UnderReview, &[ApproveDisposal, ApproveReturn]),
        (ApprovedForDisposal, &[Dispose]),
        (ApprovedForReturn, &[QuarantineAction::Return]),
        (Disposed, &[]),
        (Returned, &[]),
    ]
};

/// Actions offered for each quarantine status.
pub const QUARANTINE_ACTIONS: TransitionTable<QuarantineStatus, QuarantineAction> =
    TransitionTable::new(ACTION_EDGES);

impl QuarantineStatus {
    pub const ALL: [QuarantineStatus; 6] = [
        QuarantineStatus::PendingReview,
        QuarantineStatus::UnderReview,
        QuarantineStatus::ApprovedForDisposal,
        QuarantineStatus::ApprovedForReturn,
        QuarantineStatus::Disposed,
        QuarantineStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuarantineStatus::PendingReview => "PENDING_REVIEW",
            QuarantineStatus::UnderReview => "UNDER_REVIEW",
            QuarantineStatus::ApprovedForDisposal => "APPROVED_FOR_DISPOSAL",
            QuarantineStatus::ApprovedForReturn => "APPROVED_FOR_RETURN",
            QuarantineStatus::Disposed => "DISPOSED",
            QuarantineStatus::Returned => "RETURNED",
        }
    }

    /// Actions offered while in this status.
    pub fn actions(self) -> &'static [QuarantineAction] {
        QUARANTINE_ACTIONS.next(self)
    }

    pub fn offers(self, action: QuarantineAction) -> bool {
        QUARANTINE_ACTIONS.permits(self, action)
    }

    /// Disposed or returned: the batch has left the building.
    pub fn is_closed(self) -> bool {
        QUARANTINE_ACTIONS.is_terminal(self)
    }
}

impl QuarantineAction {
    pub const ALL: [QuarantineAction; 5] = [
        QuarantineAction::Review,
        QuarantineAction::ApproveDisposal,
        QuarantineAction::ApproveReturn,
        QuarantineAction::Dispose,
        QuarantineAction::Return,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuarantineAction::Review => "REVIEW",
            QuarantineAction::ApproveDisposal => "APPROVE_DISPOSAL",
            QuarantineAction::ApproveReturn => "APPROVE_RETURN",
            QuarantineAction::Dispose => "DISPOSE",
            QuarantineAction::Return => "RETURN",
        }
    }

    /// Status the record moves to once the action is accepted.
    pub fn resulting_status(self) -> QuarantineStatus {
        match self {
            QuarantineAction::Review => QuarantineStatus::UnderReview,
            QuarantineAction::ApproveDisposal => QuarantineStatus::ApprovedForDisposal,
            QuarantineAction::ApproveReturn => QuarantineStatus::ApprovedForReturn,
            QuarantineAction::Dispose => QuarantineStatus::Disposed,
            QuarantineAction::Return => QuarantineStatus::Returned,
        }
    }

    pub fn is_approval(self) -> bool {
        matches!(
            self,
            QuarantineAction::ApproveDisposal | QuarantineAction::ApproveReturn
        )
    }
}

impl Decision {
    /// Action code submitted for this decision.
    pub fn action(self) -> QuarantineAction {
        match self {
            Decision::Disposal => QuarantineAction::ApproveDisposal,
            Decision::Return => QuarantineAction::ApproveReturn,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Disposal => "DISPOSAL",
            Decision::Return => "RETURN",
        }
    }
}

macro_rules! impl_wire_name {
    ($t:ty, $what:literal) => {
        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
                <$t>::ALL
                    .into_iter()
                    .find(|v| v.as_str() == normalized)
                    .ok_or_else(|| DomainError::invalid_id(format!(concat!("unknown ", $what, ": {}"), s)))
            }
        }
    };
}

impl Decision {
    pub const ALL: [Decision; 2] = [Decision::Disposal, Decision::Return];
}

impl_wire_name!(QuarantineStatus, "quarantine status");
impl_wire_name!(QuarantineAction, "quarantine action");
impl_wire_name!(Decision, "decision");
