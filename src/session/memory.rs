// In-memory session store with idle expiry

use super::{Session, SessionStore};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

struct Entry {
    session: Session,
    last_access: Instant,
}

/// Sessions kept in a mutex-guarded map, expiring after `ttl` of inactivity
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Entry>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.duration_since(entry.last_access) > self.ttl
    }
}

impl SessionStore for MemorySessionStore {
    fn contains(&self, id: &str) -> bool {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions
            .get(id)
            .is_some_and(|e| !self.is_expired(e, Instant::now()))
    }

    fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> R {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = sessions.entry(id.to_string()).or_insert_with(|| Entry {
            session: Session::default(),
            last_access: now,
        });
        if self.is_expired(entry, now) {
            entry.session = Session::default();
        }
        entry.last_access = now;
        f(&mut entry.session)
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, e| !self.is_expired(e, now));
        before - sessions.len()
    }
}
