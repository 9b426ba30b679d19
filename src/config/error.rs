//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Tolerance must be positive and finite")]
    InvalidTolerance,

    #[error("Iteration cap must be positive")]
    InvalidIterationCap,

    #[error("Promax kappa must be at least 1")]
    InvalidKappa,

    #[error("Bootstrap confidence must lie strictly between 0 and 1")]
    InvalidConfidence,

    #[error("Resample count must be positive")]
    InvalidResampleCount,

    #[error("Permutation count must be positive")]
    InvalidPermutationCount,

    #[error("Idle timeout must be positive")]
    InvalidIdleTimeout,

    #[error("Sweep interval must be positive and no longer than the idle timeout")]
    InvalidSweepInterval,

    #[error("Event channel capacity must be positive")]
    InvalidChannelCapacity,
}
