//! # Residual Partitioning
//!
//! Whatever survives extraction is split into consecutive fixed-length windows per event
//! type. The window length starts at the number of remaining days and is halved until the
//! projected volume (frozen average × length) drops strictly below the ceiling. Remaining
//! days are then walked in first-seen order in chunks of that length, with a shorter final
//! chunk for any leftover days.
//!
//! A length of one day is terminal: once halving reaches it, nothing is emitted for the
//! event type. Setting `single_day_windows` in the config lets a single day be tried as a
//! window of its own instead.
//!
//! Windows are appended to a caller-owned buffer rather than returned, so extraction and
//! partitioning write into the same ordered output.

use crate::aggregation::EventSeries;
use crate::config::PlannerConfig;
use crate::RequestWindow;
use serde::Serialize;
use tracing::{debug, warn};

/// Window counts produced by residual partitioning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResidualStats {
    pub windows: usize,
    /// Event types skipped because every recorded count was zero
    pub zero_average_events: usize,
    /// Event types for which no window length above the terminal one fits, left unplanned
    pub unplaced_events: Vec<String>,
}

/// True if `length` days at `average` per day stay strictly under `ceiling`.
pub fn fits(average: f64, length: usize, ceiling: u64) -> bool {
    average * (length as f64) < ceiling as f64
}

/// Halve `start` until the projected volume fits under the ceiling.
///
/// Returns `None` once halving reaches a single day, unless `single_day_windows` allows a
/// one-day window to be checked too.
pub fn window_length(
    average: f64,
    start: usize,
    ceiling: u64,
    single_day_windows: bool,
) -> Option<usize> {
    let shortest = if single_day_windows { 1 } else { 2 };
    let mut length = start;
    while length >= shortest {
        if fits(average, length, ceiling) {
            return Some(length);
        }
        length /= 2;
    }
    None
}

/// Split one event type's remaining days into windows of at most `length` days.
///
/// Returns the number of windows appended to `out`.
pub fn partition(
    series: &EventSeries,
    length: usize,
    ceiling: u64,
    single_day_windows: bool,
    out: &mut Vec<RequestWindow>,
) -> usize {
    let Some(length) = window_length(series.average, length, ceiling, single_day_windows) else {
        warn!(
            event_type = %series.event_type,
            average = series.average,
            days = series.len(),
            "halving reached a single day without fitting, event type left unplanned"
        );
        return 0;
    };

    let before = out.len();
    for chunk in series.days.chunks(length) {
        if let (Some(first), Some(last)) = (chunk.first(), chunk.last()) {
            out.push(RequestWindow::new(
                &first.day,
                &last.day,
                vec![series.event_type.clone()],
            ));
        }
    }

    let emitted = out.len() - before;
    debug!(
        event_type = %series.event_type,
        window_length = length,
        windows = emitted,
        "partitioned residual days"
    );
    emitted
}

/// Partition every residual event type that still has days left.
pub fn partition_residual(
    residual: &[EventSeries],
    config: &PlannerConfig,
    out: &mut Vec<RequestWindow>,
) -> ResidualStats {
    let mut stats = ResidualStats::default();

    for series in residual.iter().filter(|s| !s.is_empty()) {
        if series.average == 0.0 {
            stats.zero_average_events += 1;
            continue;
        }

        let emitted = partition(
            series,
            series.len(),
            config.ceiling,
            config.single_day_windows,
            out,
        );
        if emitted == 0 {
            stats.unplaced_events.push(series.event_type.clone());
        }
        stats.windows += emitted;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::DayCount;

    fn series_with_average(event_type: &str, days: usize, average: f64) -> EventSeries {
        EventSeries {
            event_type: event_type.to_string(),
            days: (1..=days)
                .map(|d| DayCount {
                    day: format!("2024-08-{d:02}"),
                    count: average as u64,
                })
                .collect(),
            average,
        }
    }

    fn bounds(windows: &[RequestWindow]) -> Vec<(&str, &str)> {
        windows
            .iter()
            .map(|w| (w.from_day.as_str(), w.to_day.as_str()))
            .collect()
    }

    #[test]
    fn test_window_length_halves_until_strictly_below() {
        // 20_000 * 10 and 20_000 * 5 both reach the ceiling; 20_000 * 2 does not.
        assert_eq!(window_length(20_000.0, 10, 100_000, false), Some(2));
        assert_eq!(window_length(5_000.0, 10, 100_000, false), Some(10));
        assert_eq!(window_length(10.0, 0, 100_000, false), None);
    }

    #[test]
    fn test_window_length_stops_at_single_day() {
        // 7 → 3 → 1: three days of 40_000 reach the ceiling and one day is terminal.
        assert_eq!(window_length(40_000.0, 7, 100_000, false), None);
        assert_eq!(window_length(10.0, 1, 100_000, false), None);
        assert_eq!(window_length(99_999.0, 7, 100_000, false), None);
    }

    #[test]
    fn test_window_length_single_day_windows_enabled() {
        assert_eq!(window_length(40_000.0, 7, 100_000, true), Some(1));
        assert_eq!(window_length(10.0, 1, 100_000, true), Some(1));
        assert_eq!(window_length(100_000.0, 7, 100_000, true), None);
        assert_eq!(window_length(20_000.0, 10, 100_000, true), Some(2));
    }

    #[test]
    fn test_halving_scenario_ten_days() {
        let series = series_with_average("E", 10, 20_000.0);
        let mut out = Vec::new();
        let emitted = partition(&series, series.len(), 100_000, false, &mut out);

        assert_eq!(emitted, 5);
        assert_eq!(
            bounds(&out),
            vec![
                ("2024-08-01", "2024-08-02"),
                ("2024-08-03", "2024-08-04"),
                ("2024-08-05", "2024-08-06"),
                ("2024-08-07", "2024-08-08"),
                ("2024-08-09", "2024-08-10"),
            ]
        );
        assert!(out.iter().all(|w| w.event_types == vec!["E".to_string()]));
    }

    #[test]
    fn test_final_chunk_may_be_short() {
        // 30_000 * 7 → 3 days per window: 1-3, 4-6, then 7 alone.
        let series = series_with_average("E", 7, 30_000.0);
        let mut out = Vec::new();
        partition(&series, series.len(), 100_000, false, &mut out);

        assert_eq!(
            bounds(&out),
            vec![
                ("2024-08-01", "2024-08-03"),
                ("2024-08-04", "2024-08-06"),
                ("2024-08-07", "2024-08-07"),
            ]
        );
    }

    #[test]
    fn test_whole_series_fits_in_one_window() {
        let series = series_with_average("E", 31, 2_000.0);
        let mut out = Vec::new();
        partition(&series, series.len(), 100_000, false, &mut out);
        assert_eq!(bounds(&out), vec![("2024-08-01", "2024-08-31")]);
    }

    #[test]
    fn test_single_remaining_day_is_terminal() {
        let series = series_with_average("E", 1, 70_000.0);
        let mut out = Vec::new();
        assert_eq!(partition(&series, 1, 100_000, false, &mut out), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_single_remaining_day_with_single_day_windows() {
        let series = series_with_average("E", 1, 70_000.0);
        let mut out = Vec::new();
        assert_eq!(partition(&series, 1, 100_000, true, &mut out), 1);
        assert_eq!(out, vec![RequestWindow::single_day("2024-08-01", "E")]);
    }

    #[test]
    fn test_windows_follow_remaining_day_order() {
        let mut series = series_with_average("E", 4, 30_000.0);
        series.remove_days(&["2024-08-02".to_string()]);
        let mut out = Vec::new();
        partition(&series, series.len(), 100_000, false, &mut out);

        // 3 remaining days * 30_000 < 100_000, so one window spans what is left.
        assert_eq!(bounds(&out), vec![("2024-08-01", "2024-08-04")]);
    }

    #[test]
    fn test_residual_skips_empty_and_zero_average() {
        let config = PlannerConfig::default();
        let mut emptied = series_with_average("EMPTIED", 2, 50_000.0);
        emptied.days.clear();
        let residual = vec![
            emptied,
            series_with_average("ZERO", 3, 0.0),
            series_with_average("E", 4, 10_000.0),
        ];

        let mut out = Vec::new();
        let stats = partition_residual(&residual, &config, &mut out);

        assert_eq!(stats.windows, 1);
        assert_eq!(stats.zero_average_events, 1);
        assert!(stats.unplaced_events.is_empty());
        assert_eq!(out, vec![RequestWindow::new("2024-08-01", "2024-08-04", vec!["E".into()])]);
    }

    #[test]
    fn test_residual_reports_unplaced_event() {
        let config = PlannerConfig {
            single_day_windows: true,
            ..PlannerConfig::default()
        };
        // Average frozen above the ceiling while the remaining day itself is small.
        let mut series = series_with_average("HEAVY", 1, 125_000.0);
        series.days[0].count = 50_000;

        let mut out = Vec::new();
        let stats = partition_residual(&[series], &config, &mut out);
        assert!(out.is_empty());
        assert_eq!(stats.unplaced_events, vec!["HEAVY".to_string()]);
    }

    #[test]
    fn test_residual_halving_to_one_day_emits_nothing_by_default() {
        let config = PlannerConfig {
            ceiling: 30_000,
            ..PlannerConfig::default()
        };
        let series = series_with_average("E", 10, 20_000.0);

        let mut out = Vec::new();
        let stats = partition_residual(&[series], &config, &mut out);
        assert!(out.is_empty(), "10 → 5 → 2 → 1 never fits above one day");
        assert_eq!(stats.unplaced_events, vec!["E".to_string()]);
    }
}
