use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Which fetch a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchSource {
    Locks,
    Log,
}

impl FetchSource {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchSource::Locks => "locks",
            FetchSource::Log => "log",
        }
    }
}

/// Keeps a dead server from producing a warning every poll.
///
/// `should_log_failure` passes the first failure of a streak and then at most one per window.
/// `record_success` reports whether the source was failing, so recovery can be logged once.
#[derive(Debug)]
pub struct LogThrottle {
    window: Duration,
    last_logged: HashMap<FetchSource, Instant>,
    failing: HashMap<FetchSource, u64>,
}

impl LogThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_logged: HashMap::new(),
            failing: HashMap::new(),
        }
    }

    pub fn should_log_failure(&mut self, source: FetchSource) -> bool {
        self.should_log_failure_at(source, Instant::now())
    }

    fn should_log_failure_at(&mut self, source: FetchSource, now: Instant) -> bool {
        *self.failing.entry(source).or_default() += 1;
        if let Some(last) = self.last_logged.get(&source) {
            if now.duration_since(*last) < self.window {
                return false;
            }
        }
        self.last_logged.insert(source, now);
        true
    }

    /// Returns the length of the failure streak that just ended, if any.
    pub fn record_success(&mut self, source: FetchSource) -> Option<u64> {
        self.last_logged.remove(&source);
        self.failing.remove(&source)
    }
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppresses_within_window() {
        let mut throttle = LogThrottle::new(Duration::from_secs(10));
        let start = Instant::now();
        assert!(throttle.should_log_failure_at(FetchSource::Locks, start));
        assert!(!throttle.should_log_failure_at(FetchSource::Locks, start + Duration::from_secs(1)));
        assert!(throttle.should_log_failure_at(FetchSource::Log, start + Duration::from_secs(1)));
        assert!(throttle.should_log_failure_at(FetchSource::Locks, start + Duration::from_secs(11)));
    }

    #[test]
    fn recovery_reports_streak_and_resets() {
        let mut throttle = LogThrottle::new(Duration::from_secs(10));
        let start = Instant::now();
        throttle.should_log_failure_at(FetchSource::Log, start);
        throttle.should_log_failure_at(FetchSource::Log, start);
        assert_eq!(throttle.record_success(FetchSource::Log), Some(2));
        assert_eq!(throttle.record_success(FetchSource::Log), None);
        assert!(throttle.should_log_failure_at(FetchSource::Log, start));
    }
}
