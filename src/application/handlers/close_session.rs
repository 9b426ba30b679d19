//! CloseSessionHandler - explicit and idle-driven session closure.

use std::sync::Arc;

use tracing::warn;

use crate::application::session_registry::SessionRegistry;
use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope, SessionId};
use crate::domain::session::{CloseReason, SessionSnapshot};
use crate::ports::{EventPublisher, SnapshotStore};

/// Command to close a session.
#[derive(Debug, Clone, Copy)]
pub struct CloseSessionCommand {
    pub session_id: SessionId,
    pub reason: CloseReason,
}

/// Result of closing; the snapshot exists only after a confirmation.
#[derive(Debug, Clone)]
pub struct CloseSessionResult {
    pub snapshot: Option<SessionSnapshot>,
}

/// Handler for closing sessions.
pub struct CloseSessionHandler {
    registry: Arc<SessionRegistry>,
    event_publisher: Arc<dyn EventPublisher>,
    snapshot_store: Arc<dyn SnapshotStore>,
}

impl CloseSessionHandler {
    pub fn new(
        registry: Arc<SessionRegistry>,
        event_publisher: Arc<dyn EventPublisher>,
        snapshot_store: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            registry,
            event_publisher,
            snapshot_store,
        }
    }

    pub async fn handle(&self, cmd: CloseSessionCommand) -> Result<CloseSessionResult, DomainError> {
        let handle = self.registry.get(cmd.session_id)?;
        let mut session = handle.lock().await;
        let (snapshot, event) = session.close(cmd.reason)?;
        drop(session);

        // The session is closed either way; registry removal is not
        // conditional on persistence succeeding.
        self.registry.remove(cmd.session_id);

        if let Some(snapshot) = &snapshot {
            self.snapshot_store.save(snapshot).await.map_err(|e| {
                DomainError::new(
                    ErrorCode::StorageError,
                    format!("Failed to persist closing snapshot: {}", e),
                )
            })?;
        }

        if let Err(e) = self
            .event_publisher
            .publish(EventEnvelope::from_event(&event))
            .await
        {
            // The close itself succeeded; a lost closed-event is logged,
            // not surfaced.
            warn!(session_id = %cmd.session_id, error = %e, "closed-event publish failed");
        }

        Ok(CloseSessionResult { snapshot })
    }
}
