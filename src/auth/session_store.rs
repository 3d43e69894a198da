//! In-memory session storage.
//!
//! A process-lifetime, mutex-guarded map from session id to session record.
//! The store owns id generation: ids are drawn at random from the full 64-bit
//! space and the collision check and insert happen under a single lock
//! acquisition. Lock hold time is one map operation; no caller holds the lock
//! across an await point.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::auth::models::{NewSession, Session};
use crate::domain::SessionId;
use crate::errors::{AnteroomError, Result};

/// Bound on id generation retries. With a 64-bit key space and a handful of
/// live sessions, more than one iteration is already vanishingly unlikely.
const MAX_ID_GENERATION_ATTEMPTS: u32 = 64;

/// Thread-safe map of live sessions, constructed once and shared by reference.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new session under a freshly generated unique id.
    ///
    /// The generate-check-insert sequence runs entirely under the store lock,
    /// so two concurrent logins can never be assigned the same id.
    pub fn create(&self, new_session: NewSession) -> Result<Session> {
        let mut sessions = self.lock();

        let mut id = SessionId::new(OsRng.next_u64());
        let mut attempts = 1;
        while sessions.contains_key(&id) {
            if attempts >= MAX_ID_GENERATION_ATTEMPTS {
                return Err(AnteroomError::internal(
                    "Exhausted session id generation attempts",
                ));
            }
            id = SessionId::new(OsRng.next_u64());
            attempts += 1;
        }

        let now = Utc::now();
        let session = Session {
            id,
            subject: new_session.subject,
            token: new_session.token,
            expires_at: new_session.expires_at,
            created_at: now,
            updated_at: now,
        };
        sessions.insert(id, session.clone());
        Ok(session)
    }

    /// Look up a session by id, returning a copy of the record.
    pub fn find_by_id(&self, id: SessionId) -> Option<Session> {
        self.lock().get(&id).cloned()
    }

    /// Replace the stored record for the session's id, refreshing its
    /// modification timestamp. Inserts if the id is unknown, mirroring the
    /// upsert semantics of the relational repositories.
    pub fn update(&self, mut session: Session) -> Session {
        session.updated_at = Utc::now();
        self.lock().insert(session.id, session.clone());
        session
    }

    /// Remove a session. Returns true iff an entry existed and was deleted.
    pub fn remove(&self, id: SessionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Number of live sessions (expired-but-unevicted entries included).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Session>> {
        // A poisoned mutex only means another thread panicked mid-operation;
        // the map itself is still structurally sound.
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::SubjectRef;
    use crate::domain::UserId;

    fn new_session() -> NewSession {
        NewSession {
            subject: SubjectRef::User(UserId::new(1)),
            token: "token".to_string(),
            expires_at: Utc::now() + chrono::Duration::minutes(30),
        }
    }

    #[test]
    fn test_create_assigns_unique_ids() {
        let store = SessionStore::new();
        let mut ids = std::collections::HashSet::new();
        for _ in 0..100 {
            let session = store.create(new_session()).unwrap();
            assert!(ids.insert(session.id));
        }
        assert_eq!(store.len(), 100);
    }

    #[test]
    fn test_find_by_id() {
        let store = SessionStore::new();
        let session = store.create(new_session()).unwrap();

        let found = store.find_by_id(session.id).unwrap();
        assert_eq!(found.token, "token");

        let absent = SessionId::new(session.id.as_u64().wrapping_add(1));
        assert!(store.find_by_id(absent).is_none());
    }

    #[test]
    fn test_update_replaces_record() {
        let store = SessionStore::new();
        let mut session = store.create(new_session()).unwrap();

        session.token = "rotated".to_string();
        let updated = store.update(session.clone());
        assert!(updated.updated_at >= session.created_at);

        let found = store.find_by_id(session.id).unwrap();
        assert_eq!(found.token, "rotated");
    }

    #[test]
    fn test_remove_reports_prior_existence() {
        let store = SessionStore::new();
        let session = store.create(new_session()).unwrap();

        assert!(store.remove(session.id));
        assert!(!store.remove(session.id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_creates_get_distinct_ids() {
        use std::sync::Arc;

        let store = Arc::new(SessionStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                (0..50)
                    .map(|_| store.create(new_session()).unwrap().id)
                    .collect::<Vec<_>>()
            }));
        }

        let mut all_ids = std::collections::HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all_ids.insert(id), "duplicate session id handed out");
            }
        }
        assert_eq!(store.len(), 400);
    }
}
