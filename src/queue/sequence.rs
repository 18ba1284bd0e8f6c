//! Day-scoped ticket numbering.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

/// Strategy used to pick the next ticket number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberingMode {
    /// Per-day counter row, incremented atomically with the insert.
    Sequence,
    /// Count of tickets created since local midnight, plus one. Unique only
    /// because each creation holds the write lock while it counts.
    DailyCount,
}

impl NumberingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumberingMode::Sequence => "sequence",
            NumberingMode::DailyCount => "daily-count",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "sequence" => Some(NumberingMode::Sequence),
            "daily-count" | "count" => Some(NumberingMode::DailyCount),
            _ => None,
        }
    }
}

/// One local calendar day expressed as a half-open UTC interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub day: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// The local day that contains `now`.
    pub fn containing(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let day = now.with_timezone(&offset).date_naive();
        Self::for_day(day, offset)
    }

    pub fn for_day(day: NaiveDate, offset: FixedOffset) -> Self {
        let local_midnight = day.and_time(NaiveTime::default());
        let utc_midnight = local_midnight - Duration::seconds(offset.local_minus_utc() as i64);
        let start = Utc.from_utc_datetime(&utc_midnight);
        Self {
            day,
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Key of the per-day counter row.
    pub fn key(&self) -> String {
        self.day.format("%Y-%m-%d").to_string()
    }
}

/// Display label for the n-th ticket of a day. Values above 999 widen
/// the field rather than wrap.
pub fn format_number(value: u64) -> String {
    format!("#{:03}", value)
}

/// Local hour (0-23) of an instant.
pub fn local_hour(instant: DateTime<Utc>, offset: FixedOffset) -> u32 {
    instant.with_timezone(&offset).hour()
}
