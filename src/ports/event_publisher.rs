//! EventPublisher port - interface for publishing session events.
//!
//! The session coordinator publishes opened/previewed/confirmed/closed
//! events without knowing the transport. The in-memory adapter fans out
//! over broadcast channels; a collaborator may wire in a durable bus.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing domain events.
///
/// Implementations must ensure:
/// - Events are delivered at-least-once (subscribers may see duplicates)
/// - Confirmed-rotation events for one session are published in the
///   order `publish` was called, so version order survives the transport
/// - Errors are propagated to the caller
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event envelope.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish multiple events, preserving order.
    ///
    /// Adapters without atomic batches publish sequentially; a failure
    /// partway is reported and earlier events stand.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError>;
}
