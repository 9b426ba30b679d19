//! OpenSessionHandler - command handler for opening interactive sessions.

use std::sync::Arc;

use crate::application::session_registry::SessionRegistry;
use crate::domain::foundation::{DomainError, EventEnvelope, SessionId};
use crate::domain::qsort::QSortMatrix;
use crate::domain::session::{AnalysisSession, SessionOpened, SessionSettings};
use crate::ports::EventPublisher;

/// Command to open an interactive session.
#[derive(Debug, Clone)]
pub struct OpenSessionCommand {
    pub matrix: QSortMatrix,
    pub settings: SessionSettings,
}

/// Result of opening a session; extraction has already run.
#[derive(Debug, Clone)]
pub struct OpenSessionResult {
    pub session_id: SessionId,
    pub factor_count: usize,
    pub event: SessionOpened,
}

/// Handler for opening sessions.
pub struct OpenSessionHandler {
    registry: Arc<SessionRegistry>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl OpenSessionHandler {
    pub fn new(registry: Arc<SessionRegistry>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            registry,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: OpenSessionCommand) -> Result<OpenSessionResult, DomainError> {
        let (session, event) = AnalysisSession::open(cmd.matrix, cmd.settings)?;
        let session_id = session.id();
        let factor_count = session.solution().factor_count();

        self.registry.insert(session);
        self.event_publisher
            .publish(EventEnvelope::from_event(&event))
            .await?;

        Ok(OpenSessionResult {
            session_id,
            factor_count,
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::application::handlers::test_support::{test_matrix, test_settings};
    use crate::domain::foundation::ErrorCode;

    #[tokio::test]
    async fn opening_registers_session_and_publishes_event() {
        let registry = Arc::new(SessionRegistry::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let handler = OpenSessionHandler::new(registry.clone(), bus.clone());

        let result = handler
            .handle(OpenSessionCommand {
                matrix: test_matrix(),
                settings: test_settings(),
            })
            .await
            .unwrap();

        assert_eq!(result.factor_count, 2);
        assert!(registry.get(result.session_id).is_ok());
        let opened = bus.events_of_type("session.opened.v1");
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].aggregate_id, result.session_id.to_string());
    }

    #[tokio::test]
    async fn extraction_failure_registers_nothing() {
        let registry = Arc::new(SessionRegistry::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let handler = OpenSessionHandler::new(registry.clone(), bus.clone());

        let mut settings = test_settings();
        settings.extraction_options.factor_count = 99;
        let err = handler
            .handle(OpenSessionCommand {
                matrix: test_matrix(),
                settings,
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(registry.is_empty());
        assert_eq!(bus.event_count(), 0);
    }
}
