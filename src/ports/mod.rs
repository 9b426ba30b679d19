//! Ports: object-safe async traits the application layer depends on.
//!
//! Adapters implement these; handlers hold them as `Arc<dyn Trait>`.

mod event_publisher;
mod snapshot_store;

pub use event_publisher::EventPublisher;
pub use snapshot_store::{SnapshotStore, SnapshotStoreError};
