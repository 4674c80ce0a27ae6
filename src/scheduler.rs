//! Per-record refresh deadlines.
//!
//! Each rendered record owns at most one task. The event loop asks for the
//! tasks that are `due` and for the `next_deadline` to sleep until; there are
//! no threads or timers behind it.

use crate::domain::RecordId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("record {0} already has a refresh task")]
    AlreadyScheduled(RecordId),
}

#[derive(Debug, Clone)]
struct RefreshTask {
    period: Duration,
    next_due: Instant,
    last_drawn: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct RefreshScheduler {
    tasks: HashMap<RecordId, RefreshTask>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task firing every `refresh_ms` (at least 1 ms), first due one period from `now`
    pub fn start(
        &mut self,
        id: &RecordId,
        refresh_ms: u64,
        now: Instant,
    ) -> Result<(), SchedulerError> {
        if self.tasks.contains_key(id) {
            return Err(SchedulerError::AlreadyScheduled(id.clone()));
        }
        let period = Duration::from_millis(refresh_ms.max(1));
        self.tasks.insert(
            id.clone(),
            RefreshTask {
                period,
                next_due: now + period,
                last_drawn: None,
            },
        );
        Ok(())
    }

    /// Cancel the task for `id`. Returns whether one was running.
    pub fn stop(&mut self, id: &RecordId) -> bool {
        self.tasks.remove(id).is_some()
    }

    /// Replace whatever task `id` had with a fresh one
    pub fn restart(&mut self, id: &RecordId, refresh_ms: u64, now: Instant) {
        self.stop(id);
        let period = Duration::from_millis(refresh_ms.max(1));
        self.tasks.insert(
            id.clone(),
            RefreshTask {
                period,
                next_due: now + period,
                last_drawn: None,
            },
        );
    }

    pub fn is_scheduled(&self, id: &RecordId) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Ids whose deadline has passed, each once no matter how many periods were
    /// missed. Their next deadline moves past `now` on the original cadence.
    pub fn due(&mut self, now: Instant) -> Vec<RecordId> {
        let mut fired = Vec::new();
        for (id, task) in self.tasks.iter_mut() {
            if task.next_due > now {
                continue;
            }
            let late = now.duration_since(task.next_due);
            let skipped = late.as_nanos() / task.period.as_nanos();
            let steps = u32::try_from(skipped + 1).unwrap_or(u32::MAX);
            task.next_due += task.period.saturating_mul(steps);
            fired.push(id.clone());
        }
        fired.sort();
        fired
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.tasks.values().map(|task| task.next_due).min()
    }

    /// Record that `id` is being redrawn at wall time `wall`. The returned
    /// instant never goes backwards for the same task, so a clock step back
    /// cannot make a bar shrink.
    pub fn observe(&mut self, id: &RecordId, wall: DateTime<Utc>) -> DateTime<Utc> {
        match self.tasks.get_mut(id) {
            Some(task) => {
                let drawn = match task.last_drawn {
                    Some(previous) if previous > wall => previous,
                    _ => wall,
                };
                task.last_drawn = Some(drawn);
                drawn
            }
            None => wall,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn id(s: &str) -> RecordId {
        RecordId::new(s)
    }

    #[test]
    fn test_start_rejects_duplicate() {
        let mut scheduler = RefreshScheduler::new();
        let now = Instant::now();
        scheduler.start(&id("a"), 1000, now).unwrap();
        assert_eq!(
            scheduler.start(&id("a"), 500, now),
            Err(SchedulerError::AlreadyScheduled(id("a")))
        );
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_stop_twice_is_noop() {
        let mut scheduler = RefreshScheduler::new();
        let now = Instant::now();
        scheduler.start(&id("a"), 1000, now).unwrap();
        assert!(scheduler.stop(&id("a")));
        assert!(!scheduler.stop(&id("a")));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_restart_replaces_task() {
        let mut scheduler = RefreshScheduler::new();
        let now = Instant::now();
        scheduler.start(&id("a"), 1000, now).unwrap();
        scheduler.restart(&id("a"), 100, now);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(
            scheduler.next_deadline(),
            Some(now + Duration::from_millis(100))
        );
    }

    #[test]
    fn test_due_fires_once_and_coalesces() {
        let mut scheduler = RefreshScheduler::new();
        let now = Instant::now();
        scheduler.start(&id("a"), 100, now).unwrap();
        scheduler.start(&id("b"), 1000, now).unwrap();

        assert!(scheduler.due(now + Duration::from_millis(50)).is_empty());

        // Five periods late: one redraw, next deadline back on the cadence
        let later = now + Duration::from_millis(550);
        assert_eq!(scheduler.due(later), vec![id("a")]);
        assert!(scheduler.due(later).is_empty());
        assert_eq!(
            scheduler.next_deadline(),
            Some(now + Duration::from_millis(600))
        );
    }

    #[test]
    fn test_zero_refresh_rate_is_clamped() {
        let mut scheduler = RefreshScheduler::new();
        let now = Instant::now();
        scheduler.start(&id("a"), 0, now).unwrap();
        assert_eq!(
            scheduler.next_deadline(),
            Some(now + Duration::from_millis(1))
        );
    }

    #[test]
    fn test_observe_is_monotonic() {
        let mut scheduler = RefreshScheduler::new();
        scheduler.start(&id("a"), 1000, Instant::now()).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap();

        assert_eq!(scheduler.observe(&id("a"), t1), t1);
        assert_eq!(scheduler.observe(&id("a"), t0), t1);
        assert_eq!(scheduler.observe(&id("missing"), t0), t0);
    }
}
