use super::enums::{Granularity, Status};
use chrono::{DateTime, Utc};

/// Status and percentage of an interval at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub status: Status,
    /// 0.0 to 100.0, unrounded
    pub percentage: f64,
}

/// A non-negative amount of time expressed in one display unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount {
    pub value: u64,
    pub unit: Granularity,
}

impl Amount {
    /// Convert a positive millisecond delta to the requested unit.
    /// Each unit floors the previous one: s = ms/1000, min = s/60, h = min/60, d = h/24.
    pub fn from_millis(millis: i64, unit: Granularity) -> Self {
        let millis = millis.max(0) as u64;
        let seconds = millis / 1000;
        let minutes = seconds / 60;
        let hours = minutes / 60;
        let days = hours / 24;

        let value = match unit {
            Granularity::Seconds => seconds,
            Granularity::Minutes => minutes,
            Granularity::Hours => hours,
            Granularity::Days => days,
        };
        Self { value, unit }
    }

    /// "12min"
    pub fn short(&self) -> String {
        format!("{}{}", self.value, self.unit.short_unit())
    }

    /// "12 minutes"
    pub fn long(&self) -> String {
        format!("{} {}", self.value, self.unit.long_unit(self.value))
    }
}

/// Time left until the end of an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Done,
    Left(Amount),
}

impl Remaining {
    pub const DONE_TEXT: &'static str = "Done";

    pub fn value(&self) -> u64 {
        match self {
            Remaining::Done => 0,
            Remaining::Left(amount) => amount.value,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Remaining::Done => Self::DONE_TEXT.to_string(),
            Remaining::Left(amount) => amount.long(),
        }
    }
}

/// Time since the start of an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elapsed {
    NotStarted,
    Since(Amount),
}

impl Elapsed {
    pub const NOT_STARTED_TEXT: &'static str = "Not started";

    pub fn value(&self) -> u64 {
        match self {
            Elapsed::NotStarted => 0,
            Elapsed::Since(amount) => amount.value,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Elapsed::NotStarted => Self::NOT_STARTED_TEXT.to_string(),
            Elapsed::Since(amount) => amount.short(),
        }
    }
}

/// A start and end instant. Nothing forces start < end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Length in milliseconds (negative when end precedes start)
    pub fn length_millis(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_milliseconds()
    }

    /// An interval whose end does not come after its start
    pub fn is_degenerate(&self) -> bool {
        self.length_millis() <= 0
    }

    /// Upcoming before start, completed after end, active in between.
    ///
    /// A degenerate interval (start >= end) has no active phase: it is
    /// completed as soon as `now` reaches its start.
    pub fn status(&self, now: DateTime<Utc>) -> Status {
        if now < self.start {
            Status::Upcoming
        } else if now > self.end || self.is_degenerate() {
            Status::Completed
        } else {
            Status::Active
        }
    }

    /// Percentage of the interval covered by `now`, from millisecond deltas
    pub fn percentage(&self, now: DateTime<Utc>) -> f64 {
        match self.status(now) {
            Status::Upcoming => 0.0,
            Status::Completed => 100.0,
            Status::Active => {
                let elapsed = now.signed_duration_since(self.start).num_milliseconds() as f64;
                elapsed / self.length_millis() as f64 * 100.0
            }
        }
    }

    pub fn progress(&self, now: DateTime<Utc>) -> Progress {
        Progress {
            status: self.status(now),
            percentage: self.percentage(now),
        }
    }

    /// Time until `end`, never negative; `Done` once `now >= end`
    pub fn time_remaining(&self, now: DateTime<Utc>, granularity: Granularity) -> Remaining {
        let diff = self.end.signed_duration_since(now).num_milliseconds();
        if diff <= 0 {
            Remaining::Done
        } else {
            Remaining::Left(Amount::from_millis(diff, granularity))
        }
    }

    /// Time since `start`; `NotStarted` while `now <= start`
    pub fn time_elapsed(&self, now: DateTime<Utc>, granularity: Granularity) -> Elapsed {
        let diff = now.signed_duration_since(self.start).num_milliseconds();
        if diff <= 0 {
            Elapsed::NotStarted
        } else {
            Elapsed::Since(Amount::from_millis(diff, granularity))
        }
    }
}
