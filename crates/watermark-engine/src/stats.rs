use crate::batch::{BatchSummary, ItemResult, ItemStatus};
use crate::types::FailureKind;
use std::collections::BTreeMap;

/// Outcome counts for a set of item results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchCounts {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub aborted: usize,
}

/// Count results by status
pub fn summarize(results: &[ItemResult]) -> BatchCounts {
    let mut counts = BatchCounts {
        total: results.len(),
        ..Default::default()
    };
    for result in results {
        match result.status {
            ItemStatus::Success => counts.succeeded += 1,
            ItemStatus::Failed => counts.failed += 1,
            ItemStatus::Aborted => counts.aborted += 1,
        }
    }
    counts
}

/// Failed items grouped by failure kind
pub fn failures_by_kind(results: &[ItemResult]) -> BTreeMap<String, usize> {
    let mut by_kind = BTreeMap::new();
    for failure in results
        .iter()
        .filter(|r| r.status == ItemStatus::Failed)
        .filter_map(|r| r.error.as_ref())
    {
        *by_kind.entry(kind_label(failure.kind).to_string()).or_insert(0) += 1;
    }
    by_kind
}

pub fn kind_label(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Validation => "validation",
        FailureKind::LogoLoad => "logo-load",
        FailureKind::Decode => "decode",
        FailureKind::Encode => "encode",
        FailureKind::Filesystem => "filesystem",
        FailureKind::NameCollision => "name-collision",
        FailureKind::Cancelled => "cancelled",
    }
}

impl BatchSummary {
    /// Fraction of submitted items that succeeded; 1.0 for an empty batch
    pub fn success_rate(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.succeeded as f32 / self.total as f32
        }
    }

    pub fn failures_by_kind(&self) -> BTreeMap<String, usize> {
        failures_by_kind(&self.results)
    }
}
