//! Dashboard summary over a set of quarantine records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::status::QuarantineStatus;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantineSummary {
    pub total_records: usize,
    #[serde(default)]
    pub by_status: BTreeMap<QuarantineStatus, usize>,
    /// Records waiting on a human (review or approval decision).
    pub awaiting_decision: usize,
    /// Estimated loss of records not yet disposed or returned.
    pub open_estimated_loss: u64,
}

impl QuarantineSummary {
    /// Build from `(status, estimated_loss)` pairs.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (QuarantineStatus, u64)>,
    {
        let mut summary = QuarantineSummary::default();
        for (status, estimated_loss) in records {
            summary.total_records += 1;
            *summary.by_status.entry(status).or_default() += 1;
            if matches!(
                status,
                QuarantineStatus::PendingReview | QuarantineStatus::UnderReview
            ) {
                summary.awaiting_decision += 1;
            }
            if !status.is_closed() {
                summary.open_estimated_loss = summary.open_estimated_loss.saturating_add(estimated_loss);
            }
        }
        summary
    }

    pub fn count(&self, status: QuarantineStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}
