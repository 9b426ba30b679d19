//! Domain layer: the statistical engine and the session aggregate.
//!
//! Everything here is framework-free. Numerics are pure functions over
//! value objects; the session aggregate owns analysis state and emits
//! domain events, and the application layer coordinates them behind
//! ports.

pub mod bootstrap;
pub mod extraction;
pub mod foundation;
pub mod pqmethod;
pub mod qsort;
pub mod rotation;
pub mod scoring;
pub mod session;
