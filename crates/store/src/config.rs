use core::time::Duration;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_PERSIST_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_LEDGER_MAX_AGE: Duration = Duration::from_secs(10 * 24 * 60 * 60);
pub const DEFAULT_LEDGER_PURGE_THRESHOLD: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct StoreConfig {
    /// How often expired entries are swept.
    pub sweep_interval: Duration,
    /// Debounce window for ledger writes.
    pub persist_delay: Duration,
    /// Ledger records last seen longer ago than this are purge candidates.
    pub ledger_max_age: Duration,
    /// The ledger is only purged once it holds more records than this.
    pub ledger_purge_threshold: usize,
}

impl StoreConfig {
    #[must_use]
    pub const fn new(
        sweep_interval: Duration,
        persist_delay: Duration,
        ledger_max_age: Duration,
        ledger_purge_threshold: usize,
    ) -> Self {
        Self {
            sweep_interval,
            persist_delay,
            ledger_max_age,
            ledger_purge_threshold,
        }
    }

    #[must_use]
    pub const fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    #[must_use]
    pub const fn with_persist_delay(mut self, persist_delay: Duration) -> Self {
        self.persist_delay = persist_delay;
        self
    }

    #[must_use]
    pub const fn with_ledger_purge_threshold(mut self, threshold: usize) -> Self {
        self.ledger_purge_threshold = threshold;
        self
    }

    #[must_use]
    pub fn ledger_max_age_millis(&self) -> u64 {
        u64::try_from(self.ledger_max_age.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_SWEEP_INTERVAL,
            DEFAULT_PERSIST_DELAY,
            DEFAULT_LEDGER_MAX_AGE,
            DEFAULT_LEDGER_PURGE_THRESHOLD,
        )
    }
}
