use {
    anyhow::bail,
    glimpse::Timer,
    itertools::Itertools,
    std::{
        collections::BTreeSet,
        time::{Duration, Instant},
    },
};

pub const DEFAULT_STUCK_LIMIT: Duration = Duration::from_secs(60);

/// Landmarks checked since the last tap.
///
/// If the same wait keeps going for longer than the limit, the controlled UI
/// has most likely frozen.
#[derive(Debug)]
pub struct StuckRecord {
    names: BTreeSet<String>,
    timer: Timer,
}

impl StuckRecord {
    pub fn new(limit: Duration) -> Self {
        Self {
            names: BTreeSet::new(),
            timer: Timer::new(limit),
        }
    }

    pub fn add(&mut self, name: &str, now: Instant) {
        self.timer.start(now);
        self.names.insert(name.to_owned());
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.timer = Timer::new(self.timer.limit());
    }

    /// Fails if landmarks have been waited for longer than the limit. The
    /// record is cleared when that happens.
    pub fn check(&mut self, now: Instant) -> anyhow::Result<()> {
        if !self.timer.is_started() || self.timer.elapsed(now) <= self.timer.limit() {
            return Ok(());
        }
        let names = self.names.iter().join(", ");
        let elapsed = self.timer.elapsed(now);
        self.clear();
        bail!("waited {elapsed:?} for [{names}], the screen seems to be stuck");
    }
}

impl Default for StuckRecord {
    fn default() -> Self {
        Self::new(DEFAULT_STUCK_LIMIT)
    }
}

#[test]
fn stuck_after_limit() {
    let start = Instant::now();
    let mut record = StuckRecord::new(Duration::from_secs(60));
    record.check(start + Duration::from_secs(600)).unwrap();

    record.add("confirm", start);
    record.add("loading", start + Duration::from_secs(30));
    record.add("confirm", start + Duration::from_secs(40));
    record.check(start + Duration::from_secs(60)).unwrap();
    let err = record.check(start + Duration::from_secs(61)).unwrap_err();
    assert!(err.to_string().contains("[confirm, loading]"), "{err}");

    // The failure resets the record.
    record.check(start + Duration::from_secs(120)).unwrap();
}

#[test]
fn clear_restarts_record() {
    let start = Instant::now();
    let mut record = StuckRecord::default();
    record.add("confirm", start);
    record.clear();
    record.add("confirm", start + Duration::from_secs(50));
    record.check(start + Duration::from_secs(100)).unwrap();
}
