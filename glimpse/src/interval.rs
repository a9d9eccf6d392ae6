use {
    crate::timer::Timer,
    std::{
        collections::HashMap,
        time::{Duration, Instant},
    },
    tracing::debug,
};

/// Per-landmark timers limiting how often a landmark may be reported as
/// freshly appeared.
#[derive(Debug, Default)]
pub struct IntervalRegistry {
    timers: HashMap<String, Timer>,
}

impl IntervalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if an evaluation of `name` may proceed.
    ///
    /// A missing or zero `interval` always passes. If the stored timer for
    /// `name` has a different interval, it is replaced by a new timer with the
    /// requested one and its elapsed progress is lost.
    pub fn gate(&mut self, name: &str, interval: Option<Duration>, now: Instant) -> bool {
        let Some(interval) = interval.filter(|interval| !interval.is_zero()) else {
            return true;
        };
        let timer = self
            .timers
            .entry(name.to_owned())
            .and_modify(|timer| {
                if timer.limit() != interval {
                    debug!(
                        "interval of {name:?} changed from {:?} to {interval:?}",
                        timer.limit()
                    );
                    *timer = Timer::new(interval);
                }
            })
            .or_insert_with(|| Timer::new(interval));
        timer.reached(now)
    }

    /// Restarts the timer of `name` after a positive detection so that the
    /// next one is suppressed for a full interval.
    pub fn fired(&mut self, name: &str, now: Instant) {
        if let Some(timer) = self.timers.get_mut(name) {
            timer.restart(now);
        }
    }

    /// Makes the next check of `name` pass regardless of elapsed time.
    pub fn reset(&mut self, name: &str) {
        if let Some(timer) = self.timers.get_mut(name) {
            timer.clear();
        }
    }

    /// Forgets the timer of `name`.
    pub fn clear(&mut self, name: &str) {
        self.timers.remove(name);
    }

    pub fn interval(&self, name: &str) -> Option<Duration> {
        self.timers.get(name).map(|timer| timer.limit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn no_interval_always_passes() {
        let now = Instant::now();
        let mut registry = IntervalRegistry::new();
        for _ in 0..3 {
            assert!(registry.gate("confirm", None, now));
            assert!(registry.gate("confirm", Some(Duration::ZERO), now));
            registry.fired("confirm", now);
        }
        assert_eq!(registry.interval("confirm"), None);
    }

    #[test]
    fn suppressed_until_interval_passes() {
        let start = Instant::now();
        let mut registry = IntervalRegistry::new();
        assert!(registry.gate("confirm", Some(5 * SECOND), start));
        registry.fired("confirm", start);
        assert!(!registry.gate("confirm", Some(5 * SECOND), start + 4 * SECOND));
        assert!(registry.gate("confirm", Some(5 * SECOND), start + 6 * SECOND));
    }

    #[test]
    fn reset_forces_next_check() {
        let start = Instant::now();
        let mut registry = IntervalRegistry::new();
        assert!(registry.gate("confirm", Some(5 * SECOND), start));
        registry.fired("confirm", start);
        assert!(!registry.gate("confirm", Some(5 * SECOND), start));
        registry.reset("confirm");
        assert!(registry.gate("confirm", Some(5 * SECOND), start));
    }

    #[test]
    fn changed_interval_replaces_timer() {
        let start = Instant::now();
        let mut registry = IntervalRegistry::new();
        assert!(registry.gate("confirm", Some(5 * SECOND), start));
        registry.fired("confirm", start);

        let later = start + 2 * SECOND;
        assert!(registry.gate("confirm", Some(SECOND), later));
        assert_eq!(registry.interval("confirm"), Some(SECOND));
        registry.fired("confirm", later);
        assert!(!registry.gate("confirm", Some(SECOND), later + SECOND / 2));
        assert!(registry.gate("confirm", Some(SECOND), later + SECOND * 11 / 10));
    }

    #[test]
    fn missing_entries_are_ignored() {
        let mut registry = IntervalRegistry::new();
        registry.reset("nothing");
        registry.clear("nothing");
        registry.fired("nothing", Instant::now());
        assert_eq!(registry.interval("nothing"), None);
    }

    #[test]
    fn clear_drops_timer() {
        let start = Instant::now();
        let mut registry = IntervalRegistry::new();
        registry.gate("confirm", Some(5 * SECOND), start);
        registry.fired("confirm", start);
        registry.clear("confirm");
        assert_eq!(registry.interval("confirm"), None);
        assert!(registry.gate("confirm", Some(5 * SECOND), start));
    }
}
