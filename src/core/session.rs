use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    user_id: i64,
    last_seen: DateTime<Utc>,
    flash: Option<Flash>,
}

/// In-memory session table keyed by session id. Sessions expire after a
/// period of inactivity; every successful lookup refreshes them.
#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<DashMap<Uuid, SessionEntry>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            idle_timeout,
        }
    }

    pub fn create(&self, user_id: i64) -> Uuid {
        let sid = Uuid::new_v4();
        self.entries.insert(
            sid,
            SessionEntry {
                user_id,
                last_seen: Utc::now(),
                flash: None,
            },
        );
        sid
    }

    /// Returns the user bound to the session, or None if it is unknown or idle.
    pub fn resolve(&self, sid: &Uuid) -> Option<i64> {
        self.resolve_at(sid, Utc::now())
    }

    pub fn resolve_at(&self, sid: &Uuid, now: DateTime<Utc>) -> Option<i64> {
        let expired = {
            let mut entry = self.entries.get_mut(sid)?;
            if now - entry.last_seen > self.idle_timeout {
                true
            } else {
                entry.last_seen = now;
                return Some(entry.user_id);
            }
        };

        if expired {
            self.entries.remove(sid);
        }
        None
    }

    pub fn destroy(&self, sid: &Uuid) {
        self.entries.remove(sid);
    }

    pub fn set_flash(&self, sid: &Uuid, flash: Flash) {
        if let Some(mut entry) = self.entries.get_mut(sid) {
            entry.flash = Some(flash);
        }
    }

    pub fn take_flash(&self, sid: &Uuid) -> Option<Flash> {
        self.entries.get_mut(sid).and_then(|mut e| e.flash.take())
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut purged = 0;
        self.entries.retain(|_, entry| {
            let keep = now - entry.last_seen <= self.idle_timeout;
            if !keep {
                purged += 1;
            }
            keep
        });
        purged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_resolve() {
        let store = SessionStore::new(Duration::minutes(30));
        let sid = store.create(7);
        assert_eq!(store.resolve(&sid), Some(7));
        assert_eq!(store.resolve(&Uuid::new_v4()), None);
    }

    #[test]
    fn test_idle_session_expires() {
        let store = SessionStore::new(Duration::minutes(30));
        let sid = store.create(7);
        let later = Utc::now() + Duration::minutes(31);
        assert_eq!(store.resolve_at(&sid, later), None);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_activity_extends_session() {
        let store = SessionStore::new(Duration::minutes(30));
        let sid = store.create(7);
        let t1 = Utc::now() + Duration::minutes(20);
        assert_eq!(store.resolve_at(&sid, t1), Some(7));
        let t2 = t1 + Duration::minutes(20);
        assert_eq!(store.resolve_at(&sid, t2), Some(7));
    }

    #[test]
    fn test_flash_is_taken_once() {
        let store = SessionStore::new(Duration::minutes(30));
        let sid = store.create(1);
        store.set_flash(&sid, Flash::success("Saved"));
        assert_eq!(store.take_flash(&sid), Some(Flash::success("Saved")));
        assert_eq!(store.take_flash(&sid), None);
    }

    #[test]
    fn test_destroy_and_purge() {
        let store = SessionStore::new(Duration::minutes(30));
        let a = store.create(1);
        store.create(2);
        store.destroy(&a);
        assert_eq!(store.resolve(&a), None);
        assert_eq!(store.purge_expired(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_purge_counts_only_removed_sessions() {
        let store = SessionStore::new(Duration::minutes(30));
        store.create(1);
        store.create(2);
        let later = Utc::now() + Duration::minutes(31);
        let active = store.create(3);
        assert_eq!(store.resolve_at(&active, later - Duration::minutes(1)), Some(3));
        assert_eq!(store.purge_expired_at(later), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.purge_expired_at(later), 0);
    }
}
