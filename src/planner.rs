//! # Batch Planner
//!
//! Runs the three planning stages over a loaded record set:
//! aggregation, tiered extraction, then residual partitioning.
//! All windows go into one output buffer in the order the stages emit them.

use crate::aggregation::{aggregate, observe, ObservedSpan};
use crate::config::PlannerConfig;
use crate::extraction::{extract, ExtractionStats};
use crate::partition::{partition_residual, ResidualStats};
use crate::{DailyRecord, RequestWindow};
use serde::Serialize;
use tracing::info;

/// Planned windows plus what each stage contributed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Plan {
    pub windows: Vec<RequestWindow>,
    pub summary: PlanSummary,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PlanSummary {
    pub records: usize,
    pub span: ObservedSpan,
    pub extraction: ExtractionStats,
    pub residual: ResidualStats,
    pub total_windows: usize,
}

/// Build the request plan for `records`.
pub fn plan(records: &[DailyRecord], config: &PlannerConfig) -> Plan {
    let span = observe(records);
    let series = aggregate(records);
    info!(
        records = records.len(),
        event_types = series.len(),
        "aggregated input"
    );

    let mut windows = Vec::new();
    let extraction = extract(series, config, &mut windows);
    let residual = partition_residual(&extraction.residual, config, &mut windows);

    info!(
        windows = windows.len(),
        residual_windows = residual.windows,
        "plan complete"
    );

    let summary = PlanSummary {
        records: records.len(),
        span,
        extraction: extraction.stats,
        residual,
        total_windows: windows.len(),
    };
    Plan { windows, summary }
}

/// Windows only, for callers that do not need the summary.
pub fn plan_windows(records: &[DailyRecord], config: &PlannerConfig) -> Vec<RequestWindow> {
    plan(records, config).windows
}
