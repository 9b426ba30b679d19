//! Command handlers.
//!
//! Each handler owns one operation: a command struct in, a result struct
//! out, ports injected as `Arc<dyn Trait>`. Handlers hold no analysis
//! state of their own; sessions live in the registry.

pub mod apply_rotation;
pub mod close_session;
pub mod open_session;
pub mod perform_analysis;
pub mod preview_rotation;
pub mod run_bootstrap;

#[cfg(test)]
pub(crate) mod test_support;

pub use apply_rotation::{ApplyRotationCommand, ApplyRotationHandler};
pub use close_session::{CloseSessionCommand, CloseSessionHandler, CloseSessionResult};
pub use open_session::{OpenSessionCommand, OpenSessionHandler, OpenSessionResult};
pub use perform_analysis::{
    AnalysisResult, GuidanceRequest, PerformAnalysisCommand, PerformAnalysisHandler,
};
pub use preview_rotation::{PreviewRotationCommand, PreviewRotationHandler, PreviewRotationResult};
pub use run_bootstrap::{BootstrapHandle, RunBootstrapCommand, RunBootstrapHandler};
