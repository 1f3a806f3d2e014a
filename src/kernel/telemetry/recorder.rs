use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use super::event::TelemetryEvent;
use super::metrics::{compute_snapshot, TelemetrySnapshot};

pub const DEFAULT_CAPACITY: usize = 10_000;

/// Bounded in-memory event log, shared by every request thread.
/// When full, the oldest event is dropped and counted.
#[derive(Debug)]
pub struct TelemetryRecorder {
    capacity: usize,
    log: Mutex<EventLog>,
}

#[derive(Debug, Default)]
struct EventLog {
    events: VecDeque<TelemetryEvent>,
    dropped: u64,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            log: Mutex::new(EventLog {
                events: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
                dropped: 0,
            }),
        }
    }

    fn log(&self) -> MutexGuard<'_, EventLog> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record(&self, event: TelemetryEvent) {
        let mut log = self.log();
        if log.events.len() >= self.capacity {
            log.events.pop_front();
            log.dropped += 1;
        }
        log.events.push_back(event);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let log = self.log();
        let mut snapshot = compute_snapshot(log.events.iter());
        snapshot.dropped_events = log.dropped;
        snapshot
    }

    pub fn len(&self) -> usize {
        self.log().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        *self.log() = EventLog::default();
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}
