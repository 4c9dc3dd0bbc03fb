use crate::model::{ReconOutcome, ReconSummary};

/// Count outcomes per class.
pub fn compute_summary(outcomes: &[ReconOutcome]) -> ReconSummary {
    let mut summary = ReconSummary { total: outcomes.len(), ..Default::default() };

    for outcome in outcomes {
        match outcome {
            ReconOutcome::Matched { .. } => summary.matched += 1,
            ReconOutcome::Mismatched { .. } => summary.mismatched += 1,
            ReconOutcome::NotFound { .. } => summary.not_found += 1,
        }
    }

    summary
}
