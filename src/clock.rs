use chrono::{DateTime, Local, Timelike, Utc};

/// Wall-clock source for the tracker, swappable so sessions can be replayed
/// without waiting in real time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;

    fn local_now(&self) -> DateTime<Local> {
        self.now().with_timezone(&Local)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Durations are tracked in whole seconds; dropping the fraction up front
/// keeps consecutive sessions exactly adjacent.
pub fn whole_seconds<Tz: chrono::TimeZone>(at: DateTime<Tz>) -> DateTime<Tz> {
    at.with_nanosecond(0).unwrap_or_else(|| at.clone())
}
