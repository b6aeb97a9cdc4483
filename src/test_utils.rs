use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use crate::{
    clock::Clock,
    db::{
        models::{PersistedEvent, WindowChangeEvent},
        EventStore,
    },
    error::{PersistError, QueryError},
    platform::{FocusPoller, WindowDescriptor},
};

const BASE_TIMESTAMP: i64 = 1_700_000_000;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(BASE_TIMESTAMP + secs, 0).unwrap()
}

pub fn window(id: &str, class_name: &str) -> WindowDescriptor {
    WindowDescriptor::new(id, class_name)
}

pub fn event_named(program: &str) -> WindowChangeEvent {
    WindowChangeEvent {
        start_timestamp: at(0),
        window_id: format!("{program}-window"),
        program_name: program.to_string(),
        window_title: String::new(),
        duration_secs: 1,
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// In-memory store with a switch to make writes fail.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<PersistedEvent>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    batches: AtomicUsize,
    write_delay: Mutex<std::time::Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Every write sleeps this long before it succeeds or fails.
    pub fn set_write_delay(&self, delay: std::time::Duration) {
        *self.write_delay.lock().unwrap() = delay;
    }

    pub fn rows(&self) -> Vec<PersistedEvent> {
        self.rows.lock().unwrap().clone()
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn insert(&self, rows: impl IntoIterator<Item = PersistedEvent>) {
        self.rows.lock().unwrap().extend(rows);
    }
}

impl EventStore for MemoryStore {
    fn append_events(&self, batch: &[WindowChangeEvent]) -> Result<(), PersistError> {
        let delay = *self.write_delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistError::Unavailable("writes disabled".into()));
        }
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .unwrap()
            .extend(batch.iter().map(PersistedEvent::from));
        Ok(())
    }

    fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PersistedEvent>, QueryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(QueryError::Unavailable("reads disabled".into()));
        }
        let (start, end) = (start.timestamp(), end.timestamp());
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.start_time >= start && row.start_time <= end)
            .cloned()
            .collect();
        // stable sort keeps insertion order among equal start times
        rows.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(rows)
    }
}

/// Follows tokio's (possibly paused) clock, starting from `at(0)`.
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = tokio::time::Instant::now() - self.origin;
        at(0) + Duration::from_std(elapsed).unwrap()
    }
}

/// Replays a fixed sequence of polls, then keeps answering with the last one.
pub struct ScriptedPoller {
    script: Mutex<std::collections::VecDeque<Option<WindowDescriptor>>>,
    last: Mutex<Option<WindowDescriptor>>,
}

impl ScriptedPoller {
    pub fn new(script: impl IntoIterator<Item = Option<WindowDescriptor>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(None),
        }
    }

    pub fn fixed(window: WindowDescriptor) -> Self {
        Self::new([Some(window)])
    }
}

impl FocusPoller for ScriptedPoller {
    fn current_window(&self) -> Option<WindowDescriptor> {
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            *last = next;
        }
        last.clone()
    }
}
