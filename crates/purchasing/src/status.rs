//! Purchase order status lifecycle.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use medstock_core::{DomainError, TransitionTable};

/// Purchase order status. Serialized in the backend's SCREAMING_SNAKE_CASE form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Draft,
    Approved,
    Sent,
    PartiallyReceived,
    Received,
    Cancelled,
}

const EDGES: &[(PurchaseOrderStatus, &[PurchaseOrderStatus])] = {
    use PurchaseOrderStatus::*;
    &[
        (Draft, &[Approved, Cancelled]),
        (Approved, &[Sent, Cancelled]),
        (Sent, &[PartiallyReceived, Received, Cancelled]),
        (PartiallyReceived, &[Received, Cancelled]),
        (Received, &[]),
        (Cancelled, &[]),
    ]
};

/// One-step transitions allowed for a purchase order.
pub const PURCHASE_ORDER_TRANSITIONS: TransitionTable<PurchaseOrderStatus> =
    TransitionTable::new(EDGES);

impl PurchaseOrderStatus {
    pub const ALL: [PurchaseOrderStatus; 6] = [
        PurchaseOrderStatus::Draft,
        PurchaseOrderStatus::Approved,
        PurchaseOrderStatus::Sent,
        PurchaseOrderStatus::PartiallyReceived,
        PurchaseOrderStatus::Received,
        PurchaseOrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "DRAFT",
            PurchaseOrderStatus::Approved => "APPROVED",
            PurchaseOrderStatus::Sent => "SENT",
            PurchaseOrderStatus::PartiallyReceived => "PARTIALLY_RECEIVED",
            PurchaseOrderStatus::Received => "RECEIVED",
            PurchaseOrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Statuses reachable in one step.
    pub fn next(self) -> &'static [PurchaseOrderStatus] {
        PURCHASE_ORDER_TRANSITIONS.next(self)
    }

    pub fn can_transition_to(self, target: PurchaseOrderStatus) -> bool {
        PURCHASE_ORDER_TRANSITIONS.permits(self, target)
    }

    pub fn is_terminal(self) -> bool {
        PURCHASE_ORDER_TRANSITIONS.is_terminal(self)
    }
}

impl core::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    /// Accepts the wire form case-insensitively, with `-` or `_` separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        PurchaseOrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| DomainError::invalid_id(format!("unknown purchase order status: {s}")))
    }
}
