//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, event infrastructure, and error
//! types that form the vocabulary of the engine.

mod errors;
mod events;
mod ids;
mod session_phase;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{domain_event, DomainEvent, EventEnvelope, EventId, EventMetadata};
pub use ids::{ParticipantId, SessionId, StatementId};
pub use session_phase::SessionPhase;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
