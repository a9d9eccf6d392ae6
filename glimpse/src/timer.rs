use std::time::{Duration, Instant};

/// A re-armable timer that also counts how many times it has been checked.
///
/// [`Timer::reached`] returns `true` only if more than `limit` has elapsed
/// since the last (re)start *and* the timer has been checked more than
/// `count` times since then. The count guards against a single slow
/// screenshot making a timer fire with too few observations.
///
/// The current time is always passed in explicitly so that callers can drive
/// timers from a virtual clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    limit: Duration,
    count: u32,
    started: Option<Instant>,
    reach_count: u32,
}

impl Timer {
    pub fn new(limit: Duration) -> Self {
        Self::with_count(limit, 0)
    }

    pub fn with_count(limit: Duration, count: u32) -> Self {
        Self {
            limit,
            count,
            started: None,
            reach_count: count,
        }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }

    /// Starts the timer unless it is already running.
    pub fn start(&mut self, now: Instant) {
        if !self.is_started() {
            self.restart(now);
        }
    }

    pub fn restart(&mut self, now: Instant) {
        self.started = Some(now);
        self.reach_count = 0;
    }

    /// Stops the timer. The next [`Timer::reached`] call will return `true`.
    pub fn clear(&mut self) {
        self.started = None;
        self.reach_count = self.count;
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.started
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default()
    }

    pub fn reached(&mut self, now: Instant) -> bool {
        self.reach_count = self.reach_count.saturating_add(1);
        let elapsed_enough = match self.started {
            Some(started) => now.saturating_duration_since(started) > self.limit,
            None => true,
        };
        elapsed_enough && self.reach_count > self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_timer_is_reached() {
        let now = Instant::now();
        let mut timer = Timer::with_count(Duration::from_secs(5), 10);
        assert!(timer.reached(now));
    }

    #[test]
    fn needs_both_time_and_count() {
        let start = Instant::now();
        let mut timer = Timer::with_count(Duration::from_millis(300), 2);
        timer.restart(start);
        // Enough time, not enough checks.
        assert!(!timer.reached(start + Duration::from_secs(1)));
        assert!(!timer.reached(start + Duration::from_secs(1)));
        assert!(timer.reached(start + Duration::from_secs(1)));

        timer.restart(start);
        for _ in 0..5 {
            assert!(!timer.reached(start + Duration::from_millis(300)));
        }
        assert!(timer.reached(start + Duration::from_millis(301)));
    }

    #[test]
    fn clear_makes_next_check_pass() {
        let start = Instant::now();
        let mut timer = Timer::new(Duration::from_secs(5));
        timer.restart(start);
        assert!(!timer.reached(start));
        timer.clear();
        assert!(timer.reached(start));
    }

    #[test]
    fn start_keeps_running_timer() {
        let start = Instant::now();
        let mut timer = Timer::new(Duration::from_secs(1));
        timer.start(start);
        timer.start(start + Duration::from_millis(900));
        assert!(timer.reached(start + Duration::from_millis(1001)));
    }
}
