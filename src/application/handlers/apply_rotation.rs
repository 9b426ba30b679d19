//! ApplyRotationHandler - authoritative rotation confirmation.
//!
//! Serializes on the session's own mutex; optimistic versioning inside
//! the aggregate turns lost races into `StaleSessionVersion` instead of
//! silent overwrites.

use std::sync::Arc;

use crate::application::session_registry::SessionRegistry;
use crate::domain::foundation::{DomainError, EventEnvelope, SessionId};
use crate::domain::session::{ConfirmedRotation, RotationParams};
use crate::ports::EventPublisher;

/// Command to confirm a rotation.
#[derive(Debug, Clone)]
pub struct ApplyRotationCommand {
    pub session_id: SessionId,
    pub params: RotationParams,
    /// Version the caller last observed; must match the session's.
    pub expected_version: u64,
}

/// Handler for rotation confirmations.
pub struct ApplyRotationHandler {
    registry: Arc<SessionRegistry>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl ApplyRotationHandler {
    pub fn new(registry: Arc<SessionRegistry>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            registry,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: ApplyRotationCommand,
    ) -> Result<ConfirmedRotation, DomainError> {
        let handle = self.registry.get(cmd.session_id)?;
        let mut session = handle.lock().await;
        let (confirmed, event) = session.apply_rotation(&cmd.params, cmd.expected_version)?;
        drop(session);

        // Published under no lock but after the version bump; the bus
        // preserves publish order, so subscribers see versions ascending.
        self.event_publisher
            .publish(EventEnvelope::from_event(&event))
            .await?;

        Ok(confirmed)
    }
}
