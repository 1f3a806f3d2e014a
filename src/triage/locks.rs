use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One mutex per conversation, so at most one mutation per chat_id is in
/// flight. Unrelated conversations never contend beyond the map lookup.
#[derive(Debug, Default)]
pub struct ChatLocks {
    handles: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self, chat_id: &str) -> Arc<Mutex<()>> {
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles
            .entry(chat_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the entry for `chat_id` unless someone still holds a handle.
    pub fn release(&self, chat_id: &str) {
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        let idle = handles
            .get(chat_id)
            .map(|h| Arc::strong_count(h) == 1)
            .unwrap_or(false);
        if idle {
            handles.remove(chat_id);
        }
    }

    pub fn len(&self) -> usize {
        self.handles.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
