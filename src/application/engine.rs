//! Engine facade.
//!
//! Owns the wiring: registry, event bus, snapshot store, and
//! configuration. Callers go through the engine; handlers stay
//! constructible on their own for tests and alternative wiring.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapters::events::InMemoryEventBus;
use crate::adapters::storage::InMemorySnapshotStore;
use crate::application::handlers::{
    AnalysisResult, ApplyRotationCommand, ApplyRotationHandler, BootstrapHandle,
    CloseSessionCommand, CloseSessionHandler, CloseSessionResult, OpenSessionCommand,
    OpenSessionHandler, OpenSessionResult, PerformAnalysisCommand, PerformAnalysisHandler,
    PreviewRotationCommand, PreviewRotationHandler, PreviewRotationResult, RunBootstrapCommand,
    RunBootstrapHandler,
};
use crate::application::session_registry::SessionRegistry;
use crate::config::AppConfig;
use crate::domain::extraction::ExtractionMethod;
use crate::domain::foundation::{DomainError, EventEnvelope, SessionId, Timestamp};
use crate::domain::rotation::RotationMode;
use crate::domain::scoring::SignificanceThresholds;
use crate::domain::session::{CloseReason, SessionSettings};
use crate::ports::SnapshotStore;

/// Facade over the analysis engine.
pub struct QMethodEngine {
    config: AppConfig,
    registry: Arc<SessionRegistry>,
    bus: Arc<InMemoryEventBus>,
    snapshot_store: Arc<dyn SnapshotStore>,
}

impl QMethodEngine {
    /// Engine with in-memory adapters.
    pub fn new(config: AppConfig) -> Self {
        Self::with_snapshot_store(config, Arc::new(InMemorySnapshotStore::new()))
    }

    /// Engine with a caller-supplied snapshot store.
    pub fn with_snapshot_store(config: AppConfig, snapshot_store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            config,
            registry: Arc::new(SessionRegistry::new()),
            bus: Arc::new(InMemoryEventBus::new()),
            snapshot_store,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The live-session registry (integration tests, diagnostics).
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The event bus backing `subscribe`.
    pub fn event_bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    /// Session settings carrying the configured numerical defaults.
    pub fn default_settings(
        &self,
        extraction_method: ExtractionMethod,
        factor_count: usize,
        rotation_mode: RotationMode,
    ) -> SessionSettings {
        let analysis = &self.config.analysis;
        SessionSettings {
            extraction_method,
            extraction_options: analysis.extraction_options(factor_count),
            rotation_options: analysis.rotation_options(),
            rotation_mode,
            manual_tolerance: analysis.manual_tolerance,
            thresholds: SignificanceThresholds::default(),
        }
    }

    /// One-shot batch analysis; no session involved.
    pub fn perform_analysis(
        &self,
        cmd: PerformAnalysisCommand,
    ) -> Result<AnalysisResult, DomainError> {
        PerformAnalysisHandler::new().handle(cmd)
    }

    pub async fn open_session(
        &self,
        cmd: OpenSessionCommand,
    ) -> Result<OpenSessionResult, DomainError> {
        OpenSessionHandler::new(self.registry.clone(), self.bus.clone())
            .handle(cmd)
            .await
    }

    pub async fn preview_rotation(
        &self,
        cmd: PreviewRotationCommand,
    ) -> Result<PreviewRotationResult, DomainError> {
        PreviewRotationHandler::new(self.registry.clone(), self.bus.clone())
            .handle(cmd)
            .await
    }

    pub async fn apply_rotation(
        &self,
        cmd: ApplyRotationCommand,
    ) -> Result<crate::domain::session::ConfirmedRotation, DomainError> {
        ApplyRotationHandler::new(self.registry.clone(), self.bus.clone())
            .handle(cmd)
            .await
    }

    pub async fn close_session(
        &self,
        cmd: CloseSessionCommand,
    ) -> Result<CloseSessionResult, DomainError> {
        CloseSessionHandler::new(
            self.registry.clone(),
            self.bus.clone(),
            self.snapshot_store.clone(),
        )
        .handle(cmd)
        .await
    }

    pub async fn run_bootstrap(
        &self,
        cmd: RunBootstrapCommand,
    ) -> Result<BootstrapHandle, DomainError> {
        RunBootstrapHandler::new(self.registry.clone())
            .handle(cmd)
            .await
    }

    /// Stream of events for one session, starting from the subscription
    /// point. Ends after the session's closed event or when the bus goes
    /// away; lagged gaps are skipped rather than surfaced.
    pub fn subscribe(&self, session_id: SessionId) -> impl Stream<Item = EventEnvelope> {
        let receiver = self.bus.receiver();
        let aggregate_id = session_id.to_string();
        futures::stream::unfold(
            (receiver, aggregate_id, false),
            |(mut receiver, aggregate_id, done)| async move {
                if done {
                    return None;
                }
                loop {
                    match receiver.recv().await {
                        Ok(event) if event.aggregate_id == aggregate_id => {
                            let done = event.event_type == "session.closed.v1";
                            return Some((event, (receiver, aggregate_id, done)));
                        }
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "event subscriber lagged");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            },
        )
    }

    /// Background task reaping idle sessions on the configured interval.
    pub fn spawn_idle_sweeper(&self) -> JoinHandle<()> {
        let registry = self.registry.clone();
        let bus = self.bus.clone();
        let snapshot_store = self.snapshot_store.clone();
        let idle_secs = self.config.session.idle_timeout_secs;
        let sweep_interval = Duration::from_secs(self.config.session.sweep_interval_secs);

        tokio::spawn(async move {
            let handler = CloseSessionHandler::new(registry.clone(), bus, snapshot_store);
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; swallow it so a fresh
            // engine never sweeps before one full interval has passed.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let now = Timestamp::now();
                for session_id in registry.idle_session_ids(&now, idle_secs) {
                    match handler
                        .handle(CloseSessionCommand {
                            session_id,
                            reason: CloseReason::Idle,
                        })
                        .await
                    {
                        Ok(_) => info!(%session_id, "idle session closed"),
                        // A racing explicit close is fine; anything else
                        // is worth a log line.
                        Err(e) => warn!(%session_id, error = %e, "idle close failed"),
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    use crate::application::handlers::test_support::{test_matrix, test_settings};
    use crate::config::SessionConfig;
    use crate::domain::rotation::RotationMethod;
    use crate::domain::session::RotationParams;

    fn engine() -> QMethodEngine {
        QMethodEngine::new(AppConfig::default())
    }

    async fn open(engine: &QMethodEngine) -> SessionId {
        engine
            .open_session(OpenSessionCommand {
                matrix: test_matrix(),
                settings: test_settings(),
            })
            .await
            .unwrap()
            .session_id
    }

    #[test]
    fn default_settings_carry_configured_tolerances() {
        let engine = engine();
        let settings = engine.default_settings(
            ExtractionMethod::PrincipalComponents,
            3,
            RotationMode::Oblique,
        );
        assert_eq!(settings.extraction_options.factor_count, 3);
        assert_eq!(settings.rotation_options.tolerance, 1e-5);
        assert_eq!(settings.rotation_mode, RotationMode::Oblique);
    }

    #[tokio::test]
    async fn subscribe_sees_session_events_in_order_until_close() {
        let engine = engine();
        let session_id = open(&engine).await;
        let stream = engine.subscribe(session_id);

        engine
            .apply_rotation(ApplyRotationCommand {
                session_id,
                params: RotationParams::Method {
                    method: RotationMethod::Varimax,
                },
                expected_version: 0,
            })
            .await
            .unwrap();
        engine
            .close_session(CloseSessionCommand {
                session_id,
                reason: CloseReason::Requested,
            })
            .await
            .unwrap();

        let types: Vec<String> = stream.map(|e| e.event_type).collect().await;
        assert_eq!(types, vec!["rotation.confirmed.v1", "session.closed.v1"]);
    }

    #[tokio::test]
    async fn subscribe_ignores_other_sessions() {
        let engine = engine();
        let watched = open(&engine).await;
        let other = open(&engine).await;
        let stream = engine.subscribe(watched);

        engine
            .apply_rotation(ApplyRotationCommand {
                session_id: other,
                params: RotationParams::Method {
                    method: RotationMethod::Varimax,
                },
                expected_version: 0,
            })
            .await
            .unwrap();
        engine
            .close_session(CloseSessionCommand {
                session_id: watched,
                reason: CloseReason::Requested,
            })
            .await
            .unwrap();

        let types: Vec<String> = stream.map(|e| e.event_type).collect().await;
        assert_eq!(types, vec!["session.closed.v1"]);
    }

    #[tokio::test]
    async fn idle_sweeper_reaps_stale_sessions() {
        let config = AppConfig {
            session: SessionConfig {
                idle_timeout_secs: 1,
                sweep_interval_secs: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        let engine = QMethodEngine::new(config);
        let session_id = open(&engine).await;
        let sweeper = engine.spawn_idle_sweeper();

        tokio::time::sleep(Duration::from_millis(3000)).await;
        sweeper.abort();

        assert!(engine.registry().get(session_id).is_err());
        let closed = engine.event_bus().events_of_type("session.closed.v1");
        assert_eq!(closed.len(), 1);
    }
}
