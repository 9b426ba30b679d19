//! Adapters: concrete implementations of the ports.
//!
//! Only in-memory adapters ship with the engine; durable transports and
//! stores are the surrounding application's responsibility.

pub mod events;
pub mod storage;
