use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Per-host minimum inter-request interval gate (spec §4.3).
#[derive(Default)]
pub struct HostThrottle {
    next_available: DashMap<String, Instant>,
}

impl HostThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how long the caller must sleep before issuing a request to
    /// `host`, and atomically bumps the host's next-available slot to
    /// `now + delay` (or `wait + delay` if the host is already booked
    /// further out).
    pub fn acquire(&self, host: &str, delay: Duration) -> Duration {
        let now = Instant::now();
        let mut entry = self
            .next_available
            .entry(host.to_string())
            .or_insert(now);
        let wait = entry.saturating_duration_since(now);
        *entry = (*entry).max(now) + delay;
        wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_acquire_has_no_wait() {
        let throttle = HostThrottle::new();
        let wait = throttle.acquire("example.com", Duration::from_millis(100));
        assert_eq!(wait, Duration::ZERO);
    }

    #[test]
    fn second_acquire_waits_the_delay() {
        let throttle = HostThrottle::new();
        let delay = Duration::from_millis(200);
        throttle.acquire("example.com", delay);
        let wait = throttle.acquire("example.com", delay);
        assert!(wait > Duration::ZERO && wait <= delay);
    }

    #[test]
    fn different_hosts_are_independent() {
        let throttle = HostThrottle::new();
        let delay = Duration::from_millis(500);
        throttle.acquire("a.com", delay);
        let wait = throttle.acquire("b.com", delay);
        assert_eq!(wait, Duration::ZERO);
    }
}
