use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use crate::domain::User;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Authentication state of the session attached to the current request.
pub trait SessionGuard {
    fn is_authenticated(&self) -> bool;

    fn login(&self, user: &User);
}

struct SessionRecord {
    user_id: String,
    last_seen: Instant,
}

/// In-memory map of session id to logged-in user id.
///
/// Only authenticated sessions are stored. A session idle for longer than
/// `idle_timeout` is dropped, and once `max_sessions` is reached the
/// least recently seen session makes room for a new one. Contents do not
/// survive a restart.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionRecord>>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Handle for session `id`; the session need not exist yet.
    pub fn session(&self, id: Uuid) -> AuthSession {
        AuthSession {
            id,
            store: self.clone(),
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .is_some_and(|record| self.is_live(record, Instant::now()))
    }

    pub fn user_id(&self, id: Uuid) -> Option<String> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .filter(|record| self.is_live(record, Instant::now()))
            .map(|record| record.user_id.clone())
    }

    /// Mark session `id` as seen now. Returns `false` when it is unknown
    /// or has expired.
    pub fn touch(&self, id: Uuid) -> bool {
        let now = Instant::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        self.sweep(&mut sessions, now);

        match sessions.get_mut(&id) {
            Some(record) => {
                record.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|record| self.is_live(record, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_live(&self, record: &SessionRecord, now: Instant) -> bool {
        now.duration_since(record.last_seen) <= self.idle_timeout
    }

    fn sweep(&self, sessions: &mut HashMap<Uuid, SessionRecord>, now: Instant) {
        sessions.retain(|_, record| self.is_live(record, now));
    }

    fn set_user(&self, id: Uuid, user_id: String) {
        let now = Instant::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        self.sweep(&mut sessions, now);

        if !sessions.contains_key(&id) && sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, record)| record.last_seen)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                tracing::debug!(session_id = %oldest, "Evicting least recently seen session");
                sessions.remove(&oldest);
            }
        }

        sessions.insert(
            id,
            SessionRecord {
                user_id,
                last_seen: now,
            },
        );
    }

    fn remove(&self, id: Uuid) -> bool {
        let now = Instant::now();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some_and(|record| self.is_live(&record, now))
    }
}

/// Per-request session capability, inserted into request extensions by
/// [`session_middleware`](super::session_middleware).
#[derive(Clone)]
pub struct AuthSession {
    id: Uuid,
    store: SessionStore,
}

impl AuthSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Option<String> {
        self.store.user_id(self.id)
    }

    /// Returns whether a user was logged in.
    pub fn logout(&self) -> bool {
        self.store.remove(self.id)
    }
}

impl SessionGuard for AuthSession {
    fn is_authenticated(&self) -> bool {
        self.store.contains(self.id)
    }

    fn login(&self, user: &User) {
        self.store.set_user(self.id, user.user_id.clone());
    }
}
