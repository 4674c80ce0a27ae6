use super::enums::Status;
use super::interval::{Elapsed, Remaining};
use super::record::{Record, RecordKind};
use chrono::{DateTime, Utc};
use std::f64::consts::PI;

/// Computed values for one group period
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSnapshot {
    pub title: String,
    pub color: String,
    pub status: Status,
    pub percentage: f64,
}

/// Everything the render target needs to draw a record at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub at: DateTime<Utc>,
    pub status: Status,
    pub percentage: f64,
    pub remaining: Remaining,
    pub elapsed: Elapsed,
    /// Empty for single timers
    pub periods: Vec<PeriodSnapshot>,
}

impl ProgressSnapshot {
    /// Recompute every interval the record holds
    pub fn compute(record: &Record, now: DateTime<Utc>) -> Self {
        let progress = record.progress(now);
        let periods = match &record.kind {
            RecordKind::Single(_) => Vec::new(),
            RecordKind::Group(periods) => periods
                .iter()
                .map(|period| {
                    let p = record.period_progress(period, now);
                    PeriodSnapshot {
                        title: period.title.clone(),
                        color: period.color.clone(),
                        status: p.status,
                        percentage: p.percentage,
                    }
                })
                .collect(),
        };

        Self {
            at: now,
            status: progress.status,
            percentage: progress.percentage,
            remaining: record.time_remaining(now),
            elapsed: record.time_elapsed(now),
            periods,
        }
    }

    /// Percentage rounded for display ("42%")
    pub fn percent_label(&self) -> String {
        format!("{}%", self.percentage.round() as i64)
    }
}

/// Point on the unit circle for a percentage, starting at 12 o'clock and
/// moving clockwise. Returned in y-up coordinates.
pub fn ring_point(percentage: f64) -> (f64, f64) {
    let angle = PI / 2.0 - (percentage / 100.0) * 2.0 * PI;
    (angle.cos(), angle.sin())
}

/// Points tracing the arc from 0% to `percentage`, `steps` per full turn
pub fn ring_arc(percentage: f64, steps: usize) -> Vec<(f64, f64)> {
    let clamped = percentage.clamp(0.0, 100.0);
    let count = ((clamped / 100.0) * steps as f64).round() as usize;
    (0..=count)
        .map(|i| ring_point(i as f64 * 100.0 / steps as f64))
        .collect()
}

/// Badge text for a status
pub fn status_badge(status: Status) -> &'static str {
    match status {
        Status::Active => "◉ In progress",
        Status::Completed => "✓ Done",
        Status::Upcoming => "◌ Upcoming",
    }
}

/// Parse a "#rrggbb" color token
pub fn parse_hex_color(token: &str) -> Option<(u8, u8, u8)> {
    let hex = token.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}
