//! # Batch Planner Core Library
//!
//! This library splits a month of per-day event counts into request windows for a
//! downstream export API that caps how many events a single request may return.
//! Every window names an inclusive day range and the event types to fetch for it.
//!
//! ## Design Philosophy
//!
//! ### Deterministic, In-Memory Planning
//! - **One pass**: records are loaded up front, aggregated once and walked top to bottom
//! - **Stable ordering**: event types and days keep the order in which the input first
//!   mentions them, so the same file always produces the same windows
//! - **Frozen averages**: each event type's daily average is computed before any day is
//!   extracted and never recomputed afterwards
//!
//! ### Density Tiers
//! The planner treats event types differently depending on their average daily count:
//! - **Medium** (about half the ceiling): every day goes out as its own request
//! - **Low** (a few hundred per day): whole event types are folded together into
//!   month-wide requests
//! - **Residual** (everything else): days are chunked into the longest fixed-size window
//!   whose projected volume stays under the ceiling
//!
//! Independently of the tier, any single day above the ceiling is shipped on its own.
//!
//! ### Data Flow
//! 1. **Read**: [`records::read_records`] parses the exported CSV into [`DailyRecord`]s
//! 2. **Aggregate**: [`aggregation::aggregate`] builds one [`aggregation::EventSeries`] per event type
//! 3. **Extract**: [`extraction::extract`] handles the medium, high-volume and low tiers
//! 4. **Partition**: [`partition::partition_residual`] chunks whatever is left
//! 5. **Report**: [`report::to_json_pretty`] serializes the resulting [`RequestWindow`]s
//!
//! [`planner::plan`] runs steps 2-4 in order.

use serde::{Deserialize, Serialize};

// Module declarations
pub mod aggregation;
pub mod config;
pub mod extraction;
pub mod partition;
pub mod planner;
pub mod records;
pub mod report;

/// One row of the exported count matrix: how many events of a type happened on a day.
///
/// # Example
/// ```
/// use batch_planner_lib::DailyRecord;
///
/// let record = DailyRecord::new("2024-08-01", "CLICK_RESOURCE_CARD", 1250);
/// assert_eq!(record.count, 1250);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Calendar day as written in the source file (e.g. "2024-08-01")
    pub day: String,
    /// Event type identifier
    pub event_type: String,
    /// Number of events of this type on this day
    pub count: u64,
}

impl DailyRecord {
    pub fn new(day: impl Into<String>, event_type: impl Into<String>, count: u64) -> Self {
        DailyRecord {
            day: day.into(),
            event_type: event_type.into(),
            count,
        }
    }
}

/// A single planned request: an inclusive day range and the event types to fetch in it.
///
/// Serializes with the key `event_type` holding an array, even for a single type,
/// which is the shape the downstream exporter consumes.
///
/// # Example
/// ```
/// use batch_planner_lib::RequestWindow;
///
/// let window = RequestWindow::single_day("2024-08-03", "INVITE_TO_FORWARD");
/// assert_eq!(window.from_day, window.to_day);
/// assert_eq!(window.event_types, vec!["INVITE_TO_FORWARD".to_string()]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestWindow {
    /// First day covered (inclusive)
    pub from_day: String,
    /// Last day covered (inclusive)
    pub to_day: String,
    /// Event types requested for the whole range
    #[serde(rename = "event_type")]
    pub event_types: Vec<String>,
}

impl RequestWindow {
    pub fn new(
        from_day: impl Into<String>,
        to_day: impl Into<String>,
        event_types: Vec<String>,
    ) -> Self {
        RequestWindow {
            from_day: from_day.into(),
            to_day: to_day.into(),
            event_types,
        }
    }

    /// Window covering exactly one day of one event type.
    pub fn single_day(day: &str, event_type: &str) -> Self {
        Self::new(day, day, vec![event_type.to_string()])
    }

    pub fn is_single_day(&self) -> bool {
        self.from_day == self.to_day
    }

    /// True if `day` falls inside the inclusive range.
    ///
    /// Days are compared as strings, which matches calendar order for ISO `%Y-%m-%d` dates.
    pub fn contains_day(&self, day: &str) -> bool {
        self.from_day.as_str() <= day && day <= self.to_day.as_str()
    }

    pub fn covers(&self, event_type: &str) -> bool {
        self.event_types.iter().any(|e| e == event_type)
    }
}
