use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::{
    day::Interval,
    db::{models::PersistedEvent, EventStore},
    error::QueryError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramStat {
    pub program_name: String,
    pub total_duration_secs: i64,
    pub interval_start: DateTime<Utc>,
    pub interval_end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Name,
    #[default]
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortKey {
    /// Unknown keys fall back to duration.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "name" => SortKey::Name,
            _ => SortKey::Duration,
        }
    }
}

impl SortDirection {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }
}

/// Sums durations per program name. Names are compared exactly, so an empty
/// name is a group of its own. Output follows the order in which each program
/// first appears in `events`.
pub fn aggregate(events: &[PersistedEvent], interval: Interval) -> Vec<ProgramStat> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut stats: Vec<ProgramStat> = Vec::new();

    for event in events {
        let slot = *index.entry(event.program_name.as_str()).or_insert_with(|| {
            stats.push(ProgramStat {
                program_name: event.program_name.clone(),
                total_duration_secs: 0,
                interval_start: interval.start,
                interval_end: interval.end,
            });
            stats.len() - 1
        });
        stats[slot].total_duration_secs += event.duration_secs;
    }

    stats
}

/// Per-program totals for every persisted event starting inside `interval`.
pub fn get_program_stats<S: EventStore + ?Sized>(
    store: &S,
    interval: Interval,
) -> Result<Vec<ProgramStat>, QueryError> {
    let events = store.query_events(interval.start, interval.end)?;
    Ok(aggregate(&events, interval))
}

pub fn sort_program_stats(stats: &mut [ProgramStat], key: SortKey, direction: SortDirection) {
    stats.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Name => a.program_name.cmp(&b.program_name),
            SortKey::Duration => a
                .total_duration_secs
                .cmp(&b.total_duration_secs)
                .then_with(|| b.program_name.cmp(&a.program_name)),
        };
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}
