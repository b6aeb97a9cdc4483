use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    clock::{Clock, SystemClock},
    day::{self, Interval},
    db::{models::PersistedEvent, EventStore},
    error::{PersistError, QueryError},
    persister::{FlushMode, Persister},
    platform::WindowDescriptor,
    stats::{self, ProgramStat},
    tracker::ActivityTracker,
};

#[derive(Debug, Clone, Copy)]
pub struct TrackingOptions {
    pub record_window_titles: bool,
    pub start_of_day_hour: u32,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            record_window_titles: false,
            start_of_day_hour: day::DEFAULT_START_OF_DAY_HOUR,
        }
    }
}

struct ServiceInner<S: EventStore> {
    tracker: Arc<Mutex<ActivityTracker>>,
    persister: Persister<S>,
    clock: Arc<dyn Clock>,
    options: TrackingOptions,
}

/// Shared handle over one tracker. The background scheduler and foreground
/// callers clone it; every change to tracker state goes through its mutex.
pub struct ActivityService<S: EventStore> {
    inner: Arc<ServiceInner<S>>,
}

impl<S: EventStore> Clone for ActivityService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: EventStore> ActivityService<S> {
    pub fn new(store: Arc<S>, options: TrackingOptions) -> Self {
        Self::with_clock(store, options, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, options: TrackingOptions, clock: Arc<dyn Clock>) -> Self {
        let tracker = Arc::new(Mutex::new(ActivityTracker::new()));
        let persister = Persister::new(Arc::clone(&tracker), store, Arc::clone(&clock));
        Self {
            inner: Arc::new(ServiceInner {
                tracker,
                persister,
                clock,
                options,
            }),
        }
    }

    pub fn options(&self) -> TrackingOptions {
        self.inner.options
    }

    pub async fn observe(&self, descriptor: Option<WindowDescriptor>) -> bool {
        let mut tracker = self.inner.tracker.lock().await;
        // read the clock under the lock so a concurrent checkpoint can't land later
        let now = self.inner.clock.now();
        tracker.observe(descriptor, self.inner.options.record_window_titles, now)
    }

    pub async fn current_window(&self) -> Option<WindowDescriptor> {
        self.inner.tracker.lock().await.current_window().cloned()
    }

    pub async fn pending_events(&self) -> usize {
        self.inner.tracker.lock().await.buffer().len()
    }

    /// Persists everything pending, including the open session so far.
    pub async fn flush_now(&self) -> Result<usize, PersistError> {
        self.inner.persister.flush().await
    }

    /// Background save: writes only when a completed session is waiting, so
    /// a single long session is not cut into one row per save cycle.
    pub async fn save_pending(&self) -> Result<usize, PersistError> {
        self.inner.persister.flush_with(FlushMode::CompletedOnly).await
    }

    /// The final flush before exit; identical to `flush_now`, which already
    /// closes out the open session.
    pub async fn shutdown(&self) -> Result<usize, PersistError> {
        self.flush_now().await
    }

    pub fn day_interval(&self) -> Interval {
        day::day_interval(&self.inner.clock.local_now(), self.inner.options.start_of_day_hour)
    }

    pub fn day_bounds(&self, date: NaiveDate) -> Interval {
        day::logical_day_bounds(&Local, date, self.inner.options.start_of_day_hour)
    }

    pub async fn program_stats(&self, interval: Interval) -> Result<Vec<ProgramStat>, QueryError> {
        let store = Arc::clone(self.inner.persister.store());
        tokio::task::spawn_blocking(move || stats::get_program_stats(store.as_ref(), interval))
            .await?
    }

    pub async fn program_stats_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<ProgramStat>, QueryError> {
        self.program_stats(self.day_bounds(date)).await
    }

    /// Flushes first so the open session is counted, then aggregates today.
    /// A failed flush is logged and the stats are computed from what is
    /// already stored.
    pub async fn today_stats(&self) -> Result<Vec<ProgramStat>, QueryError> {
        if let Err(err) = self.flush_now().await {
            log::error!("serving today's stats: failed to save activity data: {err}");
        }
        self.program_stats(self.day_interval()).await
    }

    pub async fn recent_events(&self, interval: Interval) -> Result<Vec<PersistedEvent>, QueryError> {
        if let Err(err) = self.flush_now().await {
            log::error!("serving activity: failed to save activity data: {err}");
        }
        let store = Arc::clone(self.inner.persister.store());
        tokio::task::spawn_blocking(move || store.query_events(interval.start, interval.end)).await?
    }
}
