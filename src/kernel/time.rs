use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of monotonic time for every timestamp the core records.
/// Cooldowns, escalation timeouts and TTL eviction are all measured against it.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time for the running service.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Used to drive cooldown and
/// eviction scenarios deterministically.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + *offset
    }
}

/// Whole seconds elapsed between two instants, saturating at zero.
pub fn elapsed_secs(since: Instant, now: Instant) -> u64 {
    now.saturating_duration_since(since).as_secs()
}
