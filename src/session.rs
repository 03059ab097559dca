use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::page::PageState;

#[derive(Clone, Debug)]
pub struct Session {
    pub state: PageState,
    pub touched_at: DateTime<Utc>,
}

const DEFAULT_CAPACITY: usize = 1000;

/// In-memory page sessions, one per visit to `/`. Nothing here outlives the
/// process. Idle sessions are evicted by [`SessionStore::cleanup`], and the
/// store never holds more than `capacity` sessions.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<Uuid, Session>>,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Opens a fresh session, dropping the least recently touched ones when
    /// the store is full.
    pub fn create(&self) -> Uuid {
        while self.sessions.len() >= self.capacity {
            if !self.evict_oldest() {
                break;
            }
        }

        let id = Uuid::new_v4();
        self.sessions.insert(
            id,
            Session {
                state: PageState::default(),
                touched_at: Utc::now(),
            },
        );
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<PageState> {
        self.sessions.get(id).map(|s| s.value().state.clone())
    }

    /// Apply `f` to the session's state. The entry lock is held only for the
    /// duration of `f`, so callers must not await inside it.
    pub fn update<F, R>(&self, id: &Uuid, f: F) -> Option<R>
    where
        F: FnOnce(&mut PageState) -> R,
    {
        let mut entry = self.sessions.get_mut(id)?;
        let session = entry.value_mut();
        session.touched_at = Utc::now();
        Some(f(&mut session.state))
    }

    pub fn cleanup(&self, max_age: std::time::Duration) {
        // A TTL too large to represent means nothing ever expires.
        let Some(cutoff) = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            return;
        };
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.touched_at > cutoff);
        let removed = before - self.sessions.len();
        if removed > 0 {
            info!("[claimscore] Evicted {} idle page sessions", removed);
        }
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.value().touched_at)
            .map(|entry| *entry.key());
        match oldest {
            Some(id) => {
                self.sessions.remove(&id);
                debug!("[claimscore] Session store full, evicted {}", id);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[cfg(test)]
    fn backdate(&self, id: &Uuid, by: chrono::Duration) {
        if let Some(mut entry) = self.sessions.get_mut(id) {
            let session = entry.value_mut();
            session.touched_at = session.touched_at - by;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::RequestMode;
    use std::time::Duration;

    #[test]
    fn new_session_starts_fresh() {
        let store = SessionStore::new();
        let id = store.create();
        let state = store.get(&id).unwrap();
        assert_eq!(state.mode, RequestMode::Simple);
        assert!(state.result.is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sessions_are_independent() {
        let store = SessionStore::new();
        let a = store.create();
        let b = store.create();
        store.update(&a, |s| s.set_mode(RequestMode::Strict));
        assert_eq!(store.get(&a).unwrap().mode, RequestMode::Strict);
        assert_eq!(store.get(&b).unwrap().mode, RequestMode::Simple);
    }

    #[test]
    fn unknown_session_is_none() {
        let store = SessionStore::new();
        assert!(store.get(&Uuid::new_v4()).is_none());
        assert!(store.update(&Uuid::new_v4(), |s| s.reset_input()).is_none());
    }

    #[test]
    fn store_never_exceeds_capacity() {
        let store = SessionStore::with_capacity(3);
        let first = store.create();
        store.backdate(&first, chrono::Duration::minutes(10));
        let second = store.create();
        let third = store.create();

        let fourth = store.create();
        assert_eq!(store.len(), 3);
        assert!(store.get(&first).is_none());
        for id in [second, third, fourth] {
            assert!(store.get(&id).is_some());
        }

        for _ in 0..50 {
            store.create();
        }
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn cleanup_evicts_idle_sessions_only() {
        let store = SessionStore::new();
        let idle = store.create();
        let active = store.create();
        store.backdate(&idle, chrono::Duration::hours(2));

        store.cleanup(Duration::from_secs(3600));
        assert!(store.get(&idle).is_none());
        assert!(store.get(&active).is_some());
    }
}
