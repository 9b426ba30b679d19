//! QMethod Engine - Q-methodology factor analysis.
//!
//! This crate implements the statistical core of a Q-methodology study
//! platform: correlation, factor extraction, rotation, statistical output
//! generation, bootstrap reliability analysis, PQMethod-compatible I/O,
//! and the session protocol coordinating interactive rotation.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
