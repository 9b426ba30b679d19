//! Application layer - commands, handlers, and the engine facade.
//!
//! This layer orchestrates domain operations and coordinates between
//! ports. Command handlers stay independently constructible; the engine
//! wires them to shared infrastructure.

pub mod engine;
pub mod handlers;
pub mod session_registry;

pub use engine::QMethodEngine;
pub use handlers::{
    // Batch analysis
    AnalysisResult, GuidanceRequest, PerformAnalysisCommand, PerformAnalysisHandler,
    // Session lifecycle
    ApplyRotationCommand, ApplyRotationHandler,
    CloseSessionCommand, CloseSessionHandler, CloseSessionResult,
    OpenSessionCommand, OpenSessionHandler, OpenSessionResult,
    PreviewRotationCommand, PreviewRotationHandler, PreviewRotationResult,
    // Bootstrap
    BootstrapHandle, RunBootstrapCommand, RunBootstrapHandler,
};
pub use session_registry::{SessionHandle, SessionRegistry};
