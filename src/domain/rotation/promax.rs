//! Promax oblique rotation: varimax start, power target, least-squares
//! target rotation.

use nalgebra::DMatrix;

use crate::domain::foundation::{DomainError, ErrorCode};

use super::{orthomax, RotationOptions};

pub(super) struct ObliqueOutcome {
    pub loadings: DMatrix<f64>,
    pub rotation: DMatrix<f64>,
    pub factor_correlations: DMatrix<f64>,
    pub converged: bool,
    pub iterations: usize,
}

/// Promax rotation of `loadings` (participants × factors).
///
/// Raises the varimax solution element-wise to the power κ (sign
/// preserved) and solves the least-squares rotation toward that target.
/// A singular normal-equation matrix fails with `RotationSingular`
/// rather than producing NaNs.
pub(super) fn rotate(
    loadings: &DMatrix<f64>,
    options: &RotationOptions,
) -> Result<ObliqueOutcome, DomainError> {
    let varimax = orthomax::rotate(loadings, 1.0, options)?;
    let x = &varimax.loadings;
    let k = x.ncols();

    // Power target with signs preserved.
    let target = x.map(|v| v.signum() * v.abs().powf(options.promax_kappa));

    // Least squares: B = (XᵀX)⁻¹ Xᵀ P.
    let gram = x.transpose() * x;
    let gram_inverse = gram.try_inverse().ok_or_else(|| {
        singularity("varimax loadings produce a singular normal-equation matrix")
    })?;
    let mut transform = gram_inverse * x.transpose() * target;

    // Column normalization so the implied factors have unit variance.
    let transform_gram = transform.transpose() * &transform;
    let transform_gram_inverse = transform_gram
        .try_inverse()
        .ok_or_else(|| singularity("power target collapses factors onto each other"))?;
    for f in 0..k {
        let scale = transform_gram_inverse[(f, f)].sqrt();
        if !scale.is_finite() || scale <= 0.0 {
            return Err(singularity("degenerate column scale in target rotation"));
        }
        for row in 0..k {
            transform[(row, f)] *= scale;
        }
    }

    let pattern = x * &transform;
    let rotation = &varimax.rotation * &transform;

    // Φ = (BᵀB)⁻¹ has a unit diagonal after the normalization above.
    let phi = (transform.transpose() * &transform)
        .try_inverse()
        .ok_or_else(|| singularity("normalized target rotation is singular"))?;

    Ok(ObliqueOutcome {
        loadings: pattern,
        rotation,
        factor_correlations: phi,
        converged: varimax.converged,
        iterations: varimax.iterations,
    })
}

fn singularity(reason: &str) -> DomainError {
    DomainError::new(
        ErrorCode::RotationSingular,
        format!("Promax target rotation failed: {}", reason),
    )
}
