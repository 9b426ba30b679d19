//! In-memory event bus.
//!
//! Default wiring and the test double: captures every envelope for
//! assertions and fans events out over a broadcast channel that
//! `subscribe` streams are built on. A durable transport is the
//! surrounding application's concern.

use async_trait::async_trait;
use std::sync::RwLock;
use tokio::sync::broadcast;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventPublisher;

/// Broadcast capacity; lagging subscribers drop oldest events.
const CHANNEL_CAPACITY: usize = 128;

/// In-memory event bus.
///
/// Publishing is synchronous and ordered, so confirmed-rotation events
/// reach subscribers in version order.
///
/// # Panics
///
/// Capture helpers panic if the internal lock is poisoned; acceptable
/// for the test/default wiring this adapter serves.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<EventEnvelope>,
    published: RwLock<Vec<EventEnvelope>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            published: RwLock::new(Vec::new()),
        }
    }

    /// A receiver seeing every event published after this call.
    pub fn receiver(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    // === Test helpers ===

    /// All published events, in publish order.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .clone()
    }

    /// Events of one type, in publish order.
    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Events for one session, in publish order.
    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        !self.events_of_type(event_type).is_empty()
    }

    /// Clears captured events (test isolation).
    pub fn clear(&self) {
        self.published
            .write()
            .expect("InMemoryEventBus: published lock poisoned")
            .clear();
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        self.published
            .write()
            .expect("InMemoryEventBus: published lock poisoned")
            .push(event.clone());
        // A send error only means no subscriber is listening right now;
        // publishing is still considered delivered.
        let _ = self.sender.send(event);
        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: &str, aggregate_id: &str) -> EventEnvelope {
        EventEnvelope::new(event_type, aggregate_id, "AnalysisSession", json!({}))
    }

    #[tokio::test]
    async fn captures_published_events_in_order() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("session.opened.v1", "s1")).await.unwrap();
        bus.publish(envelope("rotation.confirmed.v1", "s1"))
            .await
            .unwrap();

        assert_eq!(bus.event_count(), 2);
        let events = bus.published_events();
        assert_eq!(events[0].event_type, "session.opened.v1");
        assert_eq!(events[1].event_type, "rotation.confirmed.v1");
    }

    #[tokio::test]
    async fn filters_by_type_and_aggregate() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("session.opened.v1", "s1")).await.unwrap();
        bus.publish(envelope("session.opened.v1", "s2")).await.unwrap();
        bus.publish(envelope("session.closed.v1", "s1")).await.unwrap();

        assert_eq!(bus.events_of_type("session.opened.v1").len(), 2);
        assert_eq!(bus.events_for_aggregate("s1").len(), 2);
        assert!(bus.has_event("session.closed.v1"));
        assert!(!bus.has_event("rotation.previewed.v1"));
    }

    #[tokio::test]
    async fn receivers_see_events_published_after_subscribing() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("session.opened.v1", "s1")).await.unwrap();

        let mut receiver = bus.receiver();
        bus.publish(envelope("rotation.confirmed.v1", "s1"))
            .await
            .unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event_type, "rotation.confirmed.v1");
    }

    #[tokio::test]
    async fn publish_succeeds_with_no_subscribers() {
        let bus = InMemoryEventBus::new();
        assert!(bus.publish(envelope("session.opened.v1", "s1")).await.is_ok());
    }

    #[tokio::test]
    async fn publish_all_preserves_order() {
        let bus = InMemoryEventBus::new();
        bus.publish_all(vec![
            envelope("a.v1", "s1"),
            envelope("b.v1", "s1"),
            envelope("c.v1", "s1"),
        ])
        .await
        .unwrap();
        let types: Vec<String> = bus
            .published_events()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(types, vec!["a.v1", "b.v1", "c.v1"]);
    }

    #[tokio::test]
    async fn clear_resets_capture() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("a.v1", "s1")).await.unwrap();
        bus.clear();
        assert_eq!(bus.event_count(), 0);
    }
}
