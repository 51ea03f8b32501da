//! # Plan Output
//!
//! Serializes planned windows for the exporter and renders a short plain-text summary
//! for whoever runs the planner. JSON goes to stdout or a file; the summary is meant
//! for stderr so the two never mix.

use crate::planner::PlanSummary;
use crate::RequestWindow;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

/// Pretty-printed JSON array of windows, 2-space indented.
pub fn to_json_pretty(windows: &[RequestWindow]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(windows)
}

/// Write the windows as pretty JSON to `path`.
pub fn write_json<P: AsRef<Path>>(path: P, windows: &[RequestWindow]) -> io::Result<()> {
    let json = to_json_pretty(windows)?;
    fs::write(path, json + "\n")
}

/// Human-readable breakdown of a plan.
pub fn render_summary(summary: &PlanSummary) -> String {
    let mut out = String::new();
    let span = match (&summary.span.first_day, &summary.span.last_day) {
        (Some(first), Some(last)) => format!("{first} .. {last}"),
        _ => "no data".to_string(),
    };

    // Writing to a String cannot fail.
    let _ = writeln!(
        out,
        "Input: {} records, {} event types, {} days ({span})",
        summary.records, summary.span.event_types, summary.span.distinct_days
    );
    let _ = writeln!(out, "Requests planned: {}", summary.total_windows);

    let extraction = &summary.extraction;
    let _ = writeln!(out, "  medium density days  {:>6}", extraction.medium_windows);
    let _ = writeln!(out, "  high volume days     {:>6}", extraction.high_volume_windows);
    let _ = writeln!(
        out,
        "  folded small events  {:>6}  ({} event types)",
        extraction.small_event_windows, extraction.low_density_events
    );
    let _ = writeln!(out, "  residual windows     {:>6}", summary.residual.windows);

    if !extraction.dropped_small_events.is_empty() {
        let _ = writeln!(
            out,
            "Warning: not requested (trailing small-event group): {}",
            extraction.dropped_small_events.join(", ")
        );
    }
    if !summary.residual.unplaced_events.is_empty() {
        let _ = writeln!(
            out,
            "Warning: not requested (no window fits under the ceiling): {}",
            summary.residual.unplaced_events.join(", ")
        );
    }
    if summary.residual.zero_average_events > 0 {
        let _ = writeln!(
            out,
            "Skipped {} event types with no events",
            summary.residual.zero_average_events
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::planner::plan;
    use crate::DailyRecord;
    use tempfile::NamedTempFile;

    #[test]
    fn test_json_shape_uses_event_type_array() {
        let windows = vec![RequestWindow::single_day("2024-08-01", "CLICK_RESOURCE_CARD")];
        let json = to_json_pretty(&windows).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{
                "from_day": "2024-08-01",
                "to_day": "2024-08-01",
                "event_type": ["CLICK_RESOURCE_CARD"]
            }])
        );
        assert!(json.contains("\n  {"), "expected 2-space indentation: {json}");
    }

    #[test]
    fn test_empty_plan_is_empty_array() {
        assert_eq!(to_json_pretty(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_write_json_file() {
        let file = NamedTempFile::new().unwrap();
        let windows = vec![RequestWindow::new(
            "2024-08-01",
            "2024-08-31",
            vec!["A".into(), "B".into()],
        )];
        write_json(file.path(), &windows).unwrap();

        let loaded: Vec<RequestWindow> =
            serde_json::from_slice(&fs::read(file.path()).unwrap()).unwrap();
        assert_eq!(loaded, windows);
    }

    #[test]
    fn test_summary_mentions_dropped_events() {
        let records = vec![
            DailyRecord::new("2024-08-01", "RARE", 3),
            DailyRecord::new("2024-08-01", "BUSY", 20_000),
            DailyRecord::new("2024-08-02", "BUSY", 20_000),
        ];
        let plan = plan(&records, &PlannerConfig::default());
        let text = render_summary(&plan.summary);

        assert!(text.contains("3 records, 2 event types, 2 days"));
        assert!(text.contains("2024-08-01 .. 2024-08-02"));
        assert!(text.contains("Requests planned: 1"));
        assert!(text.contains("Warning: not requested (trailing small-event group): RARE"));
    }
}
