//! # Per-Event Aggregation
//!
//! Folds the flat record list into one [`EventSeries`] per event type. Event types and
//! days keep the order in which the input first mentions them; later stages walk them in
//! that order, so window boundaries are reproducible for a given file.
//!
//! The daily average is taken once, here, over every recorded day. Extraction removes
//! days from a series afterwards but the average stays as computed.

use crate::DailyRecord;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Count recorded for one day of an event type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub day: String,
    pub count: u64,
}

/// All recorded days of one event type plus its frozen daily average.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventSeries {
    pub event_type: String,
    /// Days in first-seen order
    pub days: Vec<DayCount>,
    /// Mean count per recorded day, computed before any extraction
    pub average: f64,
}

impl EventSeries {
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Sum of the counts of the days still in the series.
    pub fn total(&self) -> u64 {
        self.days.iter().map(|d| d.count).sum()
    }

    /// Drop the listed days. The average is left untouched.
    pub fn remove_days(&mut self, days: &[String]) {
        if days.is_empty() {
            return;
        }
        let drop: HashSet<&str> = days.iter().map(String::as_str).collect();
        self.days.retain(|d| !drop.contains(d.day.as_str()));
    }
}

/// Day range and breadth of the input, reported next to the plan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ObservedSpan {
    /// Earliest day seen (string order)
    pub first_day: Option<String>,
    /// Latest day seen (string order)
    pub last_day: Option<String>,
    pub distinct_days: usize,
    pub event_types: usize,
}

/// Group records by event type, preserving first-seen order of event types and days.
///
/// A repeated (day, event type) pair keeps its original position and takes the later count.
pub fn aggregate(records: &[DailyRecord]) -> Vec<EventSeries> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut day_index: Vec<HashMap<&str, usize>> = Vec::new();
    let mut grouped: Vec<(String, Vec<DayCount>)> = Vec::new();

    for record in records {
        let slot = *index.entry(record.event_type.as_str()).or_insert_with(|| {
            grouped.push((record.event_type.clone(), Vec::new()));
            day_index.push(HashMap::new());
            grouped.len() - 1
        });

        let days = &mut grouped[slot].1;
        let existing = day_index[slot].get(record.day.as_str()).copied();
        match existing {
            Some(position) => {
                debug!(
                    event_type = %record.event_type,
                    day = %record.day,
                    "duplicate day for event type, keeping the later count"
                );
                days[position].count = record.count;
            }
            None => {
                day_index[slot].insert(record.day.as_str(), days.len());
                days.push(DayCount {
                    day: record.day.clone(),
                    count: record.count,
                });
            }
        }
    }

    grouped
        .into_iter()
        .map(|(event_type, days)| {
            let total: u64 = days.iter().map(|d| d.count).sum();
            // Every group holds at least the record that created it.
            let average = total as f64 / days.len() as f64;
            EventSeries {
                event_type,
                days,
                average,
            }
        })
        .collect()
}

/// Summarize the day range and number of event types in the input.
pub fn observe(records: &[DailyRecord]) -> ObservedSpan {
    let days: HashSet<&str> = records.iter().map(|r| r.day.as_str()).collect();
    let event_types: HashSet<&str> = records.iter().map(|r| r.event_type.as_str()).collect();

    ObservedSpan {
        first_day: days.iter().min().map(|d| d.to_string()),
        last_day: days.iter().max().map(|d| d.to_string()),
        distinct_days: days.len(),
        event_types: event_types.len(),
    }
}
