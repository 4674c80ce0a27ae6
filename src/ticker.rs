use std::time::{Duration, Instant};

/// Default tick interval in milliseconds
pub const DEFAULT_TICK_MS: u64 = 250;

/// Shortest wait, so a deadline already in the past does not spin the loop
const MIN_WAIT_MS: u64 = 1;

/// How long to wait for input: until the next refresh deadline, at most `tick_ms`
pub fn poll_timeout(tick_ms: u64, next_deadline: Option<Instant>, now: Instant) -> Duration {
    let tick = Duration::from_millis(tick_ms.max(MIN_WAIT_MS));
    let wait = match next_deadline {
        Some(deadline) => deadline.saturating_duration_since(now).min(tick),
        None => tick,
    };
    wait.max(Duration::from_millis(MIN_WAIT_MS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_timeout_without_deadline() {
        let now = Instant::now();
        assert_eq!(poll_timeout(DEFAULT_TICK_MS, None, now), Duration::from_millis(250));
    }

    #[test]
    fn test_poll_timeout_bounded_by_deadline() {
        let now = Instant::now();
        let soon = now + Duration::from_millis(40);
        assert_eq!(poll_timeout(250, Some(soon), now), Duration::from_millis(40));

        let late = now + Duration::from_secs(10);
        assert_eq!(poll_timeout(250, Some(late), now), Duration::from_millis(250));
    }

    #[test]
    fn test_poll_timeout_past_deadline() {
        let now = Instant::now();
        assert_eq!(poll_timeout(250, Some(now), now), Duration::from_millis(1));
    }
}
