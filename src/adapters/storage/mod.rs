//! Snapshot storage adapters.

mod in_memory_snapshot_store;

pub use in_memory_snapshot_store::InMemorySnapshotStore;
