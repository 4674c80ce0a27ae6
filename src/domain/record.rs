use super::enums::{Granularity, Status};
use super::interval::{Elapsed, Progress, Remaining, TimeInterval};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Position given to records that were persisted without one
pub const UNORDERED_POSITION: i64 = 999_999;

/// Refresh rate used when none (or a nonsense one) is stored
pub const DEFAULT_REFRESH_MS: u64 = 1000;

/// Colors handed out to group periods by index
pub const PERIOD_PALETTE: [&str; 8] = [
    "#6c5ce7", // violet
    "#00b894", // green
    "#fdcb6e", // yellow
    "#e17055", // orange
    "#74b9ff", // light blue
    "#fd79a8", // pink
    "#a29bfe", // lavender
    "#55efc4", // turquoise
];

/// Palette color for the period at `index`
pub fn palette_color(index: usize) -> &'static str {
    PERIOD_PALETTE[index % PERIOD_PALETTE.len()]
}

/// Opaque record identity, assigned by the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One labelled interval inside a group
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub title: String,
    pub interval: TimeInterval,
    /// Hex color token like "#6c5ce7"
    pub color: String,
}

impl Period {
    pub fn progress(&self, now: DateTime<Utc>) -> Progress {
        self.interval.progress(now)
    }
}

/// What a record tracks
#[derive(Debug, Clone, PartialEq)]
pub enum RecordKind {
    Single(TimeInterval),
    Group(Vec<Period>),
}

/// A persisted unit of tracking: a single timer or a group of periods
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub owner_id: String,
    pub title: String,
    pub granularity: Granularity,
    /// Milliseconds between redraws, always >= 1
    pub refresh_rate: u64,
    pub position: i64,
    pub kind: RecordKind,
}

impl Record {
    pub fn is_group(&self) -> bool {
        matches!(self.kind, RecordKind::Group(_))
    }

    pub fn periods(&self) -> &[Period] {
        match &self.kind {
            RecordKind::Single(_) => &[],
            RecordKind::Group(periods) => periods,
        }
    }

    /// Progress of one group period (same rules as a single interval)
    pub fn period_progress(&self, period: &Period, now: DateTime<Utc>) -> Progress {
        period.progress(now)
    }

    /// Earliest start and latest end. An empty group collapses to (now, now).
    pub fn global_range(&self, now: DateTime<Utc>) -> TimeInterval {
        match &self.kind {
            RecordKind::Single(interval) => *interval,
            RecordKind::Group(periods) => {
                let start = periods.iter().map(|p| p.interval.start).min();
                let end = periods.iter().map(|p| p.interval.end).max();
                match (start, end) {
                    (Some(start), Some(end)) => TimeInterval::new(start, end),
                    _ => TimeInterval::new(now, now),
                }
            }
        }
    }

    /// Overall status: the interval's own for a single, combined for a group
    pub fn status(&self, now: DateTime<Utc>) -> Status {
        match &self.kind {
            RecordKind::Single(interval) => interval.status(now),
            RecordKind::Group(periods) => {
                Status::combine(periods.iter().map(|p| p.interval.status(now)))
            }
        }
    }

    /// Overall progress. Groups report their combined status with the
    /// percentage of their global range.
    pub fn progress(&self, now: DateTime<Utc>) -> Progress {
        match &self.kind {
            RecordKind::Single(interval) => interval.progress(now),
            RecordKind::Group(_) => Progress {
                status: self.status(now),
                percentage: self.global_range(now).percentage(now),
            },
        }
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> Remaining {
        self.global_range(now).time_remaining(now, self.granularity)
    }

    pub fn time_elapsed(&self, now: DateTime<Utc>) -> Elapsed {
        self.global_range(now).time_elapsed(now, self.granularity)
    }
}
