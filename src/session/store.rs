use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use super::types::{Session, SessionUpdate};
use crate::kernel::state::DistressState;
use crate::kernel::time::{elapsed_secs, Clock};

/// System of record for per-conversation sessions.
///
/// Expiry is lazy: each live session has one `(instant, chat_id)` entry on a
/// min-heap, and a sweep only pops entries older than the cutoff. A popped
/// entry whose session was touched since is re-queued at its `last_update`.
pub struct SessionStore {
    clock: Arc<dyn Clock>,
    timeout: Duration,
    cooldown: Duration,
    inner: RwLock<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    sessions: HashMap<String, Session>,
    expiry: BinaryHeap<Reverse<(Instant, String)>>,
    // Ids with an entry on `expiry`. Ended sessions keep theirs until popped.
    queued: HashSet<String>,
    // Evicted ids not yet collected by the owner of the side tables.
    evicted: Vec<String>,
}

impl StoreInner {
    fn sweep(&mut self, now: Instant, timeout: Duration) -> usize {
        let Some(cutoff) = now.checked_sub(timeout) else {
            return 0;
        };

        let mut removed = 0;
        while let Some(Reverse((touched_at, _))) = self.expiry.peek() {
            if *touched_at >= cutoff {
                break;
            }
            let Some(Reverse((_, chat_id))) = self.expiry.pop() else {
                break;
            };
            match self.sessions.get(&chat_id).map(|s| s.last_update) {
                Some(last_update) if last_update >= cutoff => {
                    self.expiry.push(Reverse((last_update, chat_id)));
                }
                Some(_) => {
                    self.sessions.remove(&chat_id);
                    self.queued.remove(&chat_id);
                    self.evicted.push(chat_id);
                    removed += 1;
                }
                None => {
                    self.queued.remove(&chat_id);
                }
            }
        }
        removed
    }

    /// Refreshes `last_update`, creating the session if needed. The flag is
    /// true when the session was created by this call.
    fn touch(&mut self, chat_id: &str, now: Instant) -> (&mut Session, bool) {
        if !self.queued.contains(chat_id) {
            self.queued.insert(chat_id.to_string());
            self.expiry.push(Reverse((now, chat_id.to_string())));
        }
        let session = match self.sessions.entry(chat_id.to_string()) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => (entry.insert(Session::new(chat_id, now)), true),
        };
        session.0.last_update = now;
        session
    }
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>, timeout: Duration, cooldown: Duration) -> Self {
        Self {
            clock,
            timeout,
            cooldown,
            inner: RwLock::new(StoreInner::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a snapshot of the session for `chat_id`, creating it if needed.
    /// Expired sessions are evicted first; `last_update` is refreshed.
    pub fn get_or_create(&self, chat_id: &str) -> Session {
        self.open(chat_id).0
    }

    /// Like [`get_or_create`](Self::get_or_create), but also reports whether
    /// the session is new. A chat evicted by this very call counts as new.
    pub fn open(&self, chat_id: &str) -> (Session, bool) {
        let now = self.clock.now();
        let mut inner = self.write();
        let evicted = inner.sweep(now, self.timeout);
        if evicted > 0 {
            debug!(evicted, "expired sessions evicted");
        }
        let (session, created) = inner.touch(chat_id, now);
        (session.clone(), created)
    }

    /// Read-only lookup. Does not create, refresh or evict.
    pub fn get(&self, chat_id: &str) -> Option<Session> {
        self.read().sessions.get(chat_id).cloned()
    }

    /// Applies a partial update and returns the resulting snapshot.
    pub fn update(&self, chat_id: &str, update: SessionUpdate) -> Session {
        let now = self.clock.now();
        let mut inner = self.write();
        inner.sweep(now, self.timeout);
        let (session, _) = inner.touch(chat_id, now);
        update.apply(session, now);
        session.clone()
    }

    /// True when there was no intervention yet, or the cooldown has passed.
    pub fn can_intervene(&self, chat_id: &str) -> bool {
        let session = self.get_or_create(chat_id);
        match session.last_intervention {
            None => true,
            Some(last) => self.clock.now().saturating_duration_since(last.at) >= self.cooldown,
        }
    }

    /// True once an intervention has had its cooldown, unless the
    /// conversation was stopped or is in crisis.
    pub fn should_check_in(&self, chat_id: &str) -> bool {
        let session = self.get_or_create(chat_id);
        if session.is_stopped() || session.current_state == DistressState::CrisisRisk {
            return false;
        }
        match session.last_intervention {
            Some(last) => self.clock.now().saturating_duration_since(last.at) >= self.cooldown,
            None => false,
        }
    }

    pub fn session_duration(&self, chat_id: &str) -> u64 {
        let session = self.get_or_create(chat_id);
        elapsed_secs(session.session_start, self.clock.now())
    }

    /// Removes a session outright. Returns false if there was none.
    pub fn end(&self, chat_id: &str) -> bool {
        self.write().sessions.remove(chat_id).is_some()
    }

    /// Runs an eviction pass without touching any session.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        self.write().sweep(now, self.timeout)
    }

    /// Hands over the ids evicted since the last call.
    pub fn drain_evicted(&self) -> Vec<String> {
        let mut inner = self.write();
        if inner.evicted.is_empty() {
            return Vec::new();
        }
        std::mem::take(&mut inner.evicted)
    }

    /// Entries waiting on the expiry heap. At most one per session id.
    pub fn pending_expiries(&self) -> usize {
        self.read().expiry.len()
    }

    pub fn len(&self) -> usize {
        self.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
