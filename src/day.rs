use chrono::{DateTime, Days, Duration, LocalResult, NaiveDate, TimeZone, Timelike, Utc};
use serde::Serialize;

pub const DEFAULT_START_OF_DAY_HOUR: u32 = 4;

/// Closed query interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Local `date` at `hour:00:00`. Inside a DST gap this is the first instant
/// after the gap; for a repeated hour it is the earlier occurrence.
fn at_hour<Tz: TimeZone>(tz: &Tz, date: NaiveDate, hour: u32) -> DateTime<Tz> {
    let naive = date.and_time(chrono::NaiveTime::MIN) + Duration::hours(i64::from(hour.min(23)));
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => at,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}

/// Start of the logical day containing `now`. Before `start_hour` the
/// logical day is still the previous calendar day.
pub fn logical_day_start<Tz: TimeZone>(now: &DateTime<Tz>, start_hour: u32) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    let date = if now.hour() >= start_hour {
        today
    } else {
        today.checked_sub_days(Days::new(1)).unwrap_or(today)
    };
    let start = at_hour(&tz, date, start_hour);
    if start > *now {
        now.clone()
    } else {
        start
    }
}

/// The logical day so far: from its start up to and including `now`.
pub fn day_interval<Tz: TimeZone>(now: &DateTime<Tz>, start_hour: u32) -> Interval {
    Interval::new(
        logical_day_start(now, start_hour).with_timezone(&Utc),
        now.with_timezone(&Utc),
    )
}

/// The whole logical day named by `date`: from `date` at `start_hour` up to
/// the last second before the next day's start.
pub fn logical_day_bounds<Tz: TimeZone>(tz: &Tz, date: NaiveDate, start_hour: u32) -> Interval {
    let next_date = date.checked_add_days(Days::new(1)).unwrap_or(date);
    let start = at_hour(tz, date, start_hour).with_timezone(&Utc);
    let next = at_hour(tz, next_date, start_hour).with_timezone(&Utc);
    let end = (next - Duration::seconds(1)).max(start);
    Interval::new(start, end)
}
