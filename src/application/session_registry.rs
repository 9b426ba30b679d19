//! Registry of live interactive sessions.
//!
//! Sessions are arena-owned here and mutated only through their handler
//! paths. Each session sits behind its own `tokio::Mutex` so concurrent
//! confirmations on one session serialize while previews on other
//! sessions proceed untouched.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode, SessionId, Timestamp};
use crate::domain::session::AnalysisSession;

/// Shared handle to one live session.
pub type SessionHandle = Arc<Mutex<AnalysisSession>>;

/// In-memory arena of open sessions.
///
/// # Panics
///
/// Methods panic if the map lock is poisoned, which only happens after a
/// panic while holding it.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a freshly opened session.
    pub fn insert(&self, session: AnalysisSession) -> SessionHandle {
        let id = session.id();
        let handle = Arc::new(Mutex::new(session));
        self.sessions
            .write()
            .expect("SessionRegistry: lock poisoned")
            .insert(id, handle.clone());
        handle
    }

    /// Looks up a live session.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` for unknown or already removed ids
    pub fn get(&self, id: SessionId) -> Result<SessionHandle, DomainError> {
        self.sessions
            .read()
            .expect("SessionRegistry: lock poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::SessionNotFound,
                    format!("No open session with id {}", id),
                )
            })
    }

    /// Drops a session from the arena; the handle stays valid for anyone
    /// still holding it.
    pub fn remove(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions
            .write()
            .expect("SessionRegistry: lock poisoned")
            .remove(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .expect("SessionRegistry: lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of sessions idle past the threshold, for the sweeper.
    ///
    /// Sessions locked by in-flight work are skipped this round; activity
    /// is being recorded on them anyway.
    pub fn idle_session_ids(&self, now: &Timestamp, idle_secs: u64) -> Vec<SessionId> {
        let handles: Vec<(SessionId, SessionHandle)> = {
            let map = self
                .sessions
                .read()
                .expect("SessionRegistry: lock poisoned");
            map.iter().map(|(id, h)| (*id, h.clone())).collect()
        };

        handles
            .into_iter()
            .filter_map(|(id, handle)| match handle.try_lock() {
                Ok(session) if session.is_idle(now, idle_secs) => Some(id),
                _ => None,
            })
            .collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
