//! Numerical analysis configuration

use serde::Deserialize;

use crate::domain::extraction::ExtractionOptions;
use crate::domain::rotation::RotationOptions;

use super::error::ValidationError;

/// Numerical defaults for extraction, rotation, guidance, and bootstrap.
///
/// These are engine-wide defaults; individual commands may override the
/// counts and seeds but inherit the tolerances.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Convergence tolerance for iterative rotations
    #[serde(default = "default_rotation_tolerance")]
    pub rotation_tolerance: f64,

    /// Iteration cap for iterative rotations
    #[serde(default = "default_rotation_max_iterations")]
    pub rotation_max_iterations: usize,

    /// Promax power parameter
    #[serde(default = "default_promax_kappa")]
    pub promax_kappa: f64,

    /// Oblimin family parameter (0 = quartimin)
    #[serde(default = "default_oblimin_gamma")]
    pub oblimin_gamma: f64,

    /// Iteration cap for centroid extraction
    #[serde(default = "default_centroid_max_iterations")]
    pub centroid_max_iterations: usize,

    /// Residual variance below which extraction stops early
    #[serde(default = "default_residual_variance_floor")]
    pub residual_variance_floor: f64,

    /// Orthogonality tolerance for manual rotation matrices
    #[serde(default = "default_manual_tolerance")]
    pub manual_tolerance: f64,

    /// Permutations for parallel-analysis guidance
    #[serde(default = "default_guidance_permutations")]
    pub guidance_permutations: usize,

    /// Default resample count for bootstrap runs
    #[serde(default = "default_bootstrap_resamples")]
    pub bootstrap_resamples: usize,

    /// Default two-sided confidence level for bootstrap intervals
    #[serde(default = "default_bootstrap_confidence")]
    pub bootstrap_confidence: f64,
}

impl AnalysisConfig {
    /// Rotation options carrying these tolerances
    pub fn rotation_options(&self) -> RotationOptions {
        RotationOptions {
            tolerance: self.rotation_tolerance,
            max_iterations: self.rotation_max_iterations,
            promax_kappa: self.promax_kappa,
            oblimin_gamma: self.oblimin_gamma,
        }
    }

    /// Extraction options for the given factor count
    pub fn extraction_options(&self, factor_count: usize) -> ExtractionOptions {
        ExtractionOptions {
            factor_count,
            centroid_max_iterations: self.centroid_max_iterations,
            residual_variance_floor: self.residual_variance_floor,
        }
    }

    /// Validate analysis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        for tol in [
            self.rotation_tolerance,
            self.residual_variance_floor,
            self.manual_tolerance,
        ] {
            if !(tol > 0.0 && tol.is_finite()) {
                return Err(ValidationError::InvalidTolerance);
            }
        }
        if self.rotation_max_iterations == 0 || self.centroid_max_iterations == 0 {
            return Err(ValidationError::InvalidIterationCap);
        }
        if self.promax_kappa < 1.0 {
            return Err(ValidationError::InvalidKappa);
        }
        if self.guidance_permutations == 0 {
            return Err(ValidationError::InvalidPermutationCount);
        }
        if self.bootstrap_resamples == 0 {
            return Err(ValidationError::InvalidResampleCount);
        }
        if !(self.bootstrap_confidence > 0.0 && self.bootstrap_confidence < 1.0) {
            return Err(ValidationError::InvalidConfidence);
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rotation_tolerance: default_rotation_tolerance(),
            rotation_max_iterations: default_rotation_max_iterations(),
            promax_kappa: default_promax_kappa(),
            oblimin_gamma: default_oblimin_gamma(),
            centroid_max_iterations: default_centroid_max_iterations(),
            residual_variance_floor: default_residual_variance_floor(),
            manual_tolerance: default_manual_tolerance(),
            guidance_permutations: default_guidance_permutations(),
            bootstrap_resamples: default_bootstrap_resamples(),
            bootstrap_confidence: default_bootstrap_confidence(),
        }
    }
}

fn default_rotation_tolerance() -> f64 {
    1e-5
}

fn default_rotation_max_iterations() -> usize {
    50
}

fn default_promax_kappa() -> f64 {
    4.0
}

fn default_oblimin_gamma() -> f64 {
    0.0
}

fn default_centroid_max_iterations() -> usize {
    100
}

fn default_residual_variance_floor() -> f64 {
    1e-9
}

fn default_manual_tolerance() -> f64 {
    1e-6
}

fn default_guidance_permutations() -> usize {
    100
}

fn default_bootstrap_resamples() -> usize {
    1000
}

fn default_bootstrap_confidence() -> f64 {
    0.95
}
