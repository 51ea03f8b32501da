//! # Tiered Extraction
//!
//! Pulls the days that need special treatment out of the aggregated series before the
//! residual partitioner sees them. Three rules run against each event type's original
//! counts, in this order:
//!
//! 1. **Medium density**: an average strictly inside the medium band ships every day as its
//!    own single-day request. Two such days together would likely overflow the ceiling.
//! 2. **High-volume day**: any day whose count alone exceeds the ceiling ships by itself,
//!    whatever the event type's average.
//! 3. **Low density**: an average inside the low band removes the whole event type and
//!    hands its total to the [`SmallEventAccumulator`], which packs several such types into
//!    one request spanning the configured fallback range.
//!
//! Days shipped by rules 1 and 2 are recorded in a [`ProcessedSet`] and removed from the
//! series afterwards; low-density event types are dropped from the residual set entirely.

use crate::aggregation::EventSeries;
use crate::config::{DayRange, PlannerConfig};
use crate::RequestWindow;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Treatment bucket picked from an event type's frozen average.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DensityTier {
    /// Every day ships alone
    Medium,
    /// Folded into month-wide combined requests
    Low,
    /// Left for residual partitioning
    Residual,
}

/// Pick the tier for an average daily count.
pub fn classify(average: f64, config: &PlannerConfig) -> DensityTier {
    if config.medium_band.contains_exclusive(average) {
        DensityTier::Medium
    } else if config.low_band.contains_upper_inclusive(average) {
        DensityTier::Low
    } else {
        DensityTier::Residual
    }
}

/// Days already shipped as single-day requests, per event type.
///
/// Marking is idempotent: a day hit by both the medium and high-volume rules is
/// recorded, and shipped, once.
#[derive(Debug, Default)]
pub struct ProcessedSet {
    days: HashMap<String, Vec<String>>,
}

impl ProcessedSet {
    /// Record `day` for `event_type`. Returns false if it was already recorded.
    pub fn mark(&mut self, event_type: &str, day: &str) -> bool {
        let days = self.days.entry(event_type.to_string()).or_default();
        if days.iter().any(|d| d == day) {
            return false;
        }
        days.push(day.to_string());
        true
    }

    pub fn is_processed(&self, event_type: &str, day: &str) -> bool {
        self.days
            .get(event_type)
            .is_some_and(|days| days.iter().any(|d| d == day))
    }

    /// Days recorded for `event_type`, in marking order.
    pub fn days_for(&self, event_type: &str) -> &[String] {
        self.days.get(event_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of (event type, day) pairs recorded.
    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Running total of low-density event types waiting to share one request.
///
/// Each pushed event type joins the pending group. When the running sum goes over the
/// ceiling, the group minus the newcomer is flushed as one window and the newcomer starts
/// a fresh group.
#[derive(Debug)]
pub struct SmallEventAccumulator {
    ceiling: u64,
    range: DayRange,
    sum: u64,
    pending: Vec<String>,
}

impl SmallEventAccumulator {
    pub fn new(ceiling: u64, range: DayRange) -> Self {
        SmallEventAccumulator {
            ceiling,
            range,
            sum: 0,
            pending: Vec::new(),
        }
    }

    pub fn sum(&self) -> u64 {
        self.sum
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Add one event type's total. Returns the flushed window if the ceiling was crossed.
    pub fn push(&mut self, event_type: &str, total: u64) -> Option<RequestWindow> {
        self.sum = self.sum.saturating_add(total);
        self.pending.push(event_type.to_string());

        if self.sum <= self.ceiling {
            return None;
        }

        // The newcomer caused the overflow and opens the next group.
        let newcomer = self.pending.pop()?;
        let flushed = std::mem::replace(&mut self.pending, vec![newcomer]);
        self.sum = total;

        if flushed.is_empty() {
            // A single event type above the ceiling on its own; nothing to ship yet.
            debug!(event_type, total, "small event total exceeds ceiling alone");
            return None;
        }
        Some(self.window(flushed))
    }

    /// Close the accumulator.
    ///
    /// With `flush_trailing` the last group is returned as a window; otherwise it is
    /// discarded and its event types are reported back as dropped.
    pub fn finish(mut self, flush_trailing: bool) -> TrailingGroup {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return TrailingGroup::default();
        }
        if flush_trailing {
            TrailingGroup {
                window: Some(self.window(pending)),
                dropped: Vec::new(),
            }
        } else {
            TrailingGroup {
                window: None,
                dropped: pending,
            }
        }
    }

    fn window(&self, event_types: Vec<String>) -> RequestWindow {
        RequestWindow::new(&self.range.from, &self.range.to, event_types)
    }
}

/// What became of the last low-density group when the accumulator closed.
#[derive(Debug, Default, PartialEq)]
pub struct TrailingGroup {
    pub window: Option<RequestWindow>,
    pub dropped: Vec<String>,
}

/// Window counts produced by the extraction stage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub medium_windows: usize,
    pub high_volume_windows: usize,
    pub small_event_windows: usize,
    pub low_density_events: usize,
    /// Low-density event types left in the unflushed trailing group
    pub dropped_small_events: Vec<String>,
}

/// Series left for residual partitioning, plus extraction statistics.
#[derive(Debug)]
pub struct Extraction {
    pub residual: Vec<EventSeries>,
    pub stats: ExtractionStats,
}

/// Apply the three extraction rules, appending emitted windows to `out`.
///
/// Per event type, medium-density days come first, then high-volume days; folded
/// low-density windows follow once every event type has been seen.
pub fn extract(
    series: Vec<EventSeries>,
    config: &PlannerConfig,
    out: &mut Vec<RequestWindow>,
) -> Extraction {
    let mut processed = ProcessedSet::default();
    let mut stats = ExtractionStats::default();
    let mut small_totals: Vec<(String, u64)> = Vec::new();
    let mut kept = Vec::with_capacity(series.len());

    for event in series {
        let tier = classify(event.average, config);

        if tier == DensityTier::Medium {
            for day in &event.days {
                if processed.mark(&event.event_type, &day.day) {
                    out.push(RequestWindow::single_day(&day.day, &event.event_type));
                    stats.medium_windows += 1;
                }
            }
        }

        for day in event.days.iter().filter(|d| d.count > config.ceiling) {
            if processed.mark(&event.event_type, &day.day) {
                out.push(RequestWindow::single_day(&day.day, &event.event_type));
                stats.high_volume_windows += 1;
            }
        }

        if tier == DensityTier::Low {
            // Summed over the original series, including any day shipped above.
            small_totals.push((event.event_type.clone(), event.total()));
            continue;
        }

        kept.push(event);
    }

    stats.low_density_events = small_totals.len();
    let mut accumulator = SmallEventAccumulator::new(config.ceiling, config.fallback_range.clone());
    for (event_type, total) in &small_totals {
        if let Some(window) = accumulator.push(event_type, *total) {
            out.push(window);
            stats.small_event_windows += 1;
        }
    }

    let trailing = accumulator.finish(config.flush_trailing);
    if let Some(window) = trailing.window {
        out.push(window);
        stats.small_event_windows += 1;
    }
    if !trailing.dropped.is_empty() {
        warn!(
            event_types = ?trailing.dropped,
            "trailing low-density group never reached the ceiling and was not flushed"
        );
    }
    stats.dropped_small_events = trailing.dropped;

    for event in &mut kept {
        event.remove_days(processed.days_for(&event.event_type));
    }

    info!(
        medium = stats.medium_windows,
        high_volume = stats.high_volume_windows,
        small_events = stats.small_event_windows,
        residual_events = kept.len(),
        "extraction complete"
    );

    Extraction {
        residual: kept,
        stats,
    }
}
