use chrono::{DateTime, Utc};
use serde::Serialize;

/// A completed focus session. Built once by the tracker and never edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowChangeEvent {
    pub start_timestamp: DateTime<Utc>,
    pub window_id: String,
    pub program_name: String,
    pub window_title: String,
    pub duration_secs: u32,
}

impl WindowChangeEvent {
    pub fn end_timestamp(&self) -> DateTime<Utc> {
        self.start_timestamp + chrono::Duration::seconds(i64::from(self.duration_secs))
    }
}

// Row of the `event` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedEvent {
    pub start_time: i64,
    pub program_name: String,
    pub window_title: Option<String>,
    pub duration_secs: i64,
}

impl PersistedEvent {
    pub fn start_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.start_time, 0)
    }
}

impl From<&WindowChangeEvent> for PersistedEvent {
    fn from(event: &WindowChangeEvent) -> Self {
        Self {
            start_time: event.start_timestamp.timestamp(),
            program_name: event.program_name.clone(),
            window_title: (!event.window_title.is_empty()).then(|| event.window_title.clone()),
            duration_secs: i64::from(event.duration_secs),
        }
    }
}
