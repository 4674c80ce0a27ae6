use serde::{Deserialize, Serialize};

/// Where "now" sits relative to an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Upcoming,
    Active,
    Completed,
}

impl Status {
    /// Combine per-period statuses into one group status.
    /// Active wins, then all-completed, otherwise upcoming.
    pub fn combine<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Status>,
    {
        let mut all_completed = true;
        for status in statuses {
            match status {
                Status::Active => return Status::Active,
                Status::Completed => {}
                Status::Upcoming => all_completed = false,
            }
        }
        if all_completed {
            Status::Completed
        } else {
            Status::Upcoming
        }
    }
}

/// Display unit for remaining/elapsed text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl Granularity {
    /// Parse from the persisted tag ("seconds", "minutes", ...)
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_lowercase().as_str() {
            "seconds" => Some(Self::Seconds),
            "minutes" => Some(Self::Minutes),
            "hours" => Some(Self::Hours),
            "days" => Some(Self::Days),
            _ => None,
        }
    }

    pub fn to_tag(&self) -> &'static str {
        match self {
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
        }
    }

    /// Compact unit suffix ("s", "min", "h", "d")
    pub fn short_unit(&self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Minutes => "min",
            Self::Hours => "h",
            Self::Days => "d",
        }
    }

    /// Spelled-out unit, singular or plural
    pub fn long_unit(&self, value: u64) -> &'static str {
        match (self, value == 1) {
            (Self::Seconds, true) => "second",
            (Self::Seconds, false) => "seconds",
            (Self::Minutes, true) => "minute",
            (Self::Minutes, false) => "minutes",
            (Self::Hours, true) => "hour",
            (Self::Hours, false) => "hours",
            (Self::Days, true) => "day",
            (Self::Days, false) => "days",
        }
    }

    /// Next granularity, wrapping (for cycling in the form)
    pub fn next(&self) -> Self {
        match self {
            Self::Seconds => Self::Minutes,
            Self::Minutes => Self::Hours,
            Self::Hours => Self::Days,
            Self::Days => Self::Seconds,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Self::Seconds => Self::Days,
            Self::Minutes => Self::Seconds,
            Self::Hours => Self::Minutes,
            Self::Days => Self::Hours,
        }
    }

    pub fn all() -> &'static [Granularity] {
        &[
            Granularity::Seconds,
            Granularity::Minutes,
            Granularity::Hours,
            Granularity::Days,
        ]
    }
}

/// UI mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiMode {
    Normal,
    /// Add/edit form is open
    Form,
    /// Waiting for y/n on a delete
    ConfirmDelete,
}
