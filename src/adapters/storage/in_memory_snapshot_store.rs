//! In-memory snapshot store.
//!
//! Default wiring and the test double for the `SnapshotStore` port.
//! Durable persistence belongs to the surrounding application.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::SessionId;
use crate::domain::session::SessionSnapshot;
use crate::ports::{SnapshotStore, SnapshotStoreError};

/// Keeps snapshots in a map keyed by session id.
///
/// # Panics
///
/// Methods panic if the internal lock is poisoned; acceptable for the
/// test/default wiring this adapter serves.
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<SessionId, SessionSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored snapshots (test helper).
    pub fn len(&self) -> usize {
        self.snapshots
            .read()
            .expect("InMemorySnapshotStore: lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SnapshotStoreError> {
        self.snapshots
            .write()
            .expect("InMemorySnapshotStore: lock poisoned")
            .insert(snapshot.session_id, snapshot.clone());
        Ok(())
    }

    async fn load(&self, session_id: SessionId) -> Result<SessionSnapshot, SnapshotStoreError> {
        self.snapshots
            .read()
            .expect("InMemorySnapshotStore: lock poisoned")
            .get(&session_id)
            .cloned()
            .ok_or(SnapshotStoreError::NotFound(session_id))
    }

    async fn exists(&self, session_id: SessionId) -> Result<bool, SnapshotStoreError> {
        Ok(self
            .snapshots
            .read()
            .expect("InMemorySnapshotStore: lock poisoned")
            .contains_key(&session_id))
    }

    async fn delete(&self, session_id: SessionId) -> Result<(), SnapshotStoreError> {
        self.snapshots
            .write()
            .expect("InMemorySnapshotStore: lock poisoned")
            .remove(&session_id);
        Ok(())
    }
}
