//! PreviewRotationHandler - ephemeral rotation previews.
//!
//! Previews are pure reads of the session's confirmed loadings; the
//! version is untouched and the preview event is advisory.

use std::sync::Arc;

use crate::application::session_registry::SessionRegistry;
use crate::domain::foundation::{DomainError, EventEnvelope, SessionId};
use crate::domain::rotation::{RotatedSolution, RotationDelta};
use crate::ports::EventPublisher;

/// Command to preview one plane rotation.
#[derive(Debug, Clone, Copy)]
pub struct PreviewRotationCommand {
    pub session_id: SessionId,
    pub delta: RotationDelta,
}

/// Result of a preview; nothing was persisted.
#[derive(Debug, Clone)]
pub struct PreviewRotationResult {
    /// Confirmed version the preview was computed against.
    pub base_version: u64,
    pub previewed: RotatedSolution,
}

/// Handler for rotation previews.
pub struct PreviewRotationHandler {
    registry: Arc<SessionRegistry>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl PreviewRotationHandler {
    pub fn new(registry: Arc<SessionRegistry>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            registry,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: PreviewRotationCommand,
    ) -> Result<PreviewRotationResult, DomainError> {
        let handle = self.registry.get(cmd.session_id)?;
        let mut session = handle.lock().await;

        let (previewed, event) = session.preview(&cmd.delta)?;
        session.touch();
        let base_version = event.base_version;
        drop(session);

        self.event_publisher
            .publish(EventEnvelope::from_event(&event))
            .await?;

        Ok(PreviewRotationResult {
            base_version,
            previewed,
        })
    }
}
