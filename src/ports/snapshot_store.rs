//! SnapshotStore port - interface for persisting confirmed session
//! snapshots.
//!
//! Durable storage of analysis results is the surrounding application's
//! responsibility; this port is the seam it plugs into. The engine only
//! writes snapshots at close time and reads them back for inspection.

use async_trait::async_trait;

use crate::domain::foundation::SessionId;
use crate::domain::session::SessionSnapshot;

/// Errors from snapshot persistence.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotStoreError {
    #[error("No snapshot stored for session {0}")]
    NotFound(SessionId),

    #[error("Failed to serialize snapshot: {0}")]
    SerializationFailed(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Port for persisting and loading session snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot, replacing any previous one for the session.
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SnapshotStoreError>;

    /// Load the snapshot for a session.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotStoreError::NotFound` if none exists.
    async fn load(&self, session_id: SessionId) -> Result<SessionSnapshot, SnapshotStoreError>;

    /// Whether a snapshot exists for the session.
    async fn exists(&self, session_id: SessionId) -> Result<bool, SnapshotStoreError>;

    /// Delete a session's snapshot, if present.
    async fn delete(&self, session_id: SessionId) -> Result<(), SnapshotStoreError>;
}
