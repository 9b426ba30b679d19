//! RunBootstrapHandler - background bootstrap runs over a session.
//!
//! Resampling is CPU-bound, so the run moves to a blocking thread; the
//! session lock is held only long enough to clone its inputs, keeping
//! previews and confirmations responsive during long runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::application::session_registry::SessionRegistry;
use crate::domain::bootstrap::{run_bootstrap, BootstrapOptions, BootstrapResult};
use crate::domain::foundation::{DomainError, ErrorCode, SessionId};

/// Command to start a bootstrap run against a session's confirmed
/// rotation.
#[derive(Debug, Clone)]
pub struct RunBootstrapCommand {
    pub session_id: SessionId,
    pub options: BootstrapOptions,
}

/// A running bootstrap. Dropping the handle does not cancel the run.
#[derive(Debug)]
pub struct BootstrapHandle {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<Result<BootstrapResult, DomainError>>,
}

impl BootstrapHandle {
    /// Requests cancellation; the run aborts between resamples.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the run to finish and returns its result.
    pub async fn wait(self) -> Result<BootstrapResult, DomainError> {
        self.task.await.map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Bootstrap task failed: {}", e),
            )
        })?
    }
}

/// Handler for bootstrap runs.
pub struct RunBootstrapHandler {
    registry: Arc<SessionRegistry>,
}

impl RunBootstrapHandler {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Starts a bootstrap run against the session's current confirmed
    /// loadings and returns immediately with a handle.
    ///
    /// The run uses the rotation method of the confirmed solution; a
    /// manually rotated or unrotated session resamples without an
    /// automatic rotation step.
    pub async fn handle(&self, cmd: RunBootstrapCommand) -> Result<BootstrapHandle, DomainError> {
        let handle = self.registry.get(cmd.session_id)?;
        let session = handle.lock().await;
        let matrix = session.matrix().clone();
        let reference = session.confirmed().clone();
        let settings = *session.settings();
        drop(session);

        let cancel = Arc::new(AtomicBool::new(false));
        let task_cancel = cancel.clone();
        let task = tokio::task::spawn_blocking(move || {
            run_bootstrap(
                &matrix,
                &reference,
                settings.extraction_method,
                &settings.extraction_options,
                reference.method(),
                &settings.rotation_options,
                &cmd.options,
                &task_cancel,
            )
        });

        Ok(BootstrapHandle { cancel, task })
    }
}
