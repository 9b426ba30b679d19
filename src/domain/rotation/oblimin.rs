//! Direct oblimin rotation via gradient projection.
//!
//! The Jennrich gradient-projection scheme for oblique rotation: descend
//! the oblimin criterion over the manifold of unit-column transformation
//! matrices. γ = 0 is quartimin; positive γ pushes toward more
//! correlated factors.

use nalgebra::DMatrix;

use crate::domain::foundation::{DomainError, ErrorCode};

use super::promax::ObliqueOutcome;
use super::RotationOptions;

pub(super) fn rotate(
    loadings: &DMatrix<f64>,
    options: &RotationOptions,
) -> Result<ObliqueOutcome, DomainError> {
    let k = loadings.ncols();
    let mut transform = DMatrix::identity(k, k);

    let mut pattern = pattern_for(loadings, &transform)?;
    let (mut value, mut criterion_gradient) = criterion(&pattern, options.oblimin_gamma);
    let mut gradient = transform_gradient(&pattern, &criterion_gradient, &transform)?;

    let mut step = 1.0_f64;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < options.max_iterations {
        iterations += 1;

        let projected = project(&gradient, &transform);
        let slope = projected.iter().map(|g| g * g).sum::<f64>().sqrt();
        if slope < options.tolerance {
            converged = true;
            break;
        }

        step *= 2.0;
        let mut accepted = false;
        for _ in 0..16 {
            let mut candidate = &transform - &projected * step;
            normalize_columns(&mut candidate);
            let candidate_pattern = pattern_for(loadings, &candidate)?;
            let (candidate_value, candidate_gradient) =
                criterion(&candidate_pattern, options.oblimin_gamma);
            if candidate_value < value - 0.5 * slope * slope * step {
                transform = candidate;
                pattern = candidate_pattern;
                value = candidate_value;
                criterion_gradient = candidate_gradient;
                accepted = true;
                break;
            }
            step /= 2.0;
        }
        if !accepted {
            // Line search exhausted: the criterion is flat at working
            // precision, treat as converged.
            converged = true;
            break;
        }

        gradient = transform_gradient(&pattern, &criterion_gradient, &transform)?;
    }

    let phi = transform.transpose() * &transform;
    Ok(ObliqueOutcome {
        loadings: pattern,
        rotation: oblique_rotation_matrix(&transform)?,
        factor_correlations: phi,
        converged,
        iterations,
    })
}

/// Pattern loadings for a transformation: L = A (Tᵀ)⁻¹.
fn pattern_for(
    loadings: &DMatrix<f64>,
    transform: &DMatrix<f64>,
) -> Result<DMatrix<f64>, DomainError> {
    let inverse = invert(transform)?;
    Ok(loadings * inverse.transpose())
}

/// The matrix actually multiplied onto the loadings, (Tᵀ)⁻¹, reported as
/// the rotation matrix so `loadings * rotation = pattern` holds for
/// oblique rotations too.
fn oblique_rotation_matrix(transform: &DMatrix<f64>) -> Result<DMatrix<f64>, DomainError> {
    Ok(invert(transform)?.transpose())
}

fn invert(transform: &DMatrix<f64>) -> Result<DMatrix<f64>, DomainError> {
    transform.clone().try_inverse().ok_or_else(|| {
        DomainError::new(
            ErrorCode::RotationSingular,
            "Oblimin transformation became singular during optimization",
        )
    })
}

/// Oblimin criterion and its gradient with respect to the pattern.
///
/// f = Σ (L² ∘ (C L² N)) / 4 with N = J_k - I and C = I - γ/n J_n.
fn criterion(pattern: &DMatrix<f64>, gamma: f64) -> (f64, DMatrix<f64>) {
    let n = pattern.nrows();
    let k = pattern.ncols();

    let squared = pattern.map(|v| v * v);

    // X = C * L² * N without materializing J explicitly.
    let cross = &squared * (DMatrix::from_element(k, k, 1.0) - DMatrix::identity(k, k));
    let x = if gamma == 0.0 {
        cross
    } else {
        let column_means = DMatrix::from_fn(1, k, |_, c| {
            (0..n).map(|r| cross[(r, c)]).sum::<f64>() / n as f64
        });
        DMatrix::from_fn(n, k, |r, c| cross[(r, c)] - gamma * column_means[(0, c)])
    };

    let value = squared.zip_map(&x, |a, b| a * b).sum() / 4.0;
    let gradient = pattern.zip_map(&x, |l, xv| l * xv);
    (value, gradient)
}

/// Gradient of the criterion with respect to the transformation:
/// G = -(Lᵀ Gq T⁻¹)ᵀ.
fn transform_gradient(
    pattern: &DMatrix<f64>,
    criterion_gradient: &DMatrix<f64>,
    transform: &DMatrix<f64>,
) -> Result<DMatrix<f64>, DomainError> {
    let inverse = invert(transform)?;
    Ok(-(pattern.transpose() * criterion_gradient * inverse).transpose())
}

/// Projects the gradient onto the manifold of unit-length columns.
fn project(gradient: &DMatrix<f64>, transform: &DMatrix<f64>) -> DMatrix<f64> {
    let k = transform.ncols();
    let mut projected = gradient.clone();
    for c in 0..k {
        let dot: f64 = (0..k).map(|r| transform[(r, c)] * gradient[(r, c)]).sum();
        for r in 0..k {
            projected[(r, c)] -= transform[(r, c)] * dot;
        }
    }
    projected
}

fn normalize_columns(matrix: &mut DMatrix<f64>) {
    for c in 0..matrix.ncols() {
        let norm: f64 = (0..matrix.nrows())
            .map(|r| matrix[(r, c)] * matrix[(r, c)])
            .sum::<f64>()
            .sqrt();
        if norm > 0.0 {
            for r in 0..matrix.nrows() {
                matrix[(r, c)] /= norm;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> RotationOptions {
        RotationOptions {
            tolerance: 1e-6,
            max_iterations: 100,
            promax_kappa: 4.0,
            oblimin_gamma: 0.0,
        }
    }

    fn correlated_loadings() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            8,
            2,
            &[
                0.80, 0.30, //
                0.78, 0.28, //
                0.75, 0.35, //
                0.72, 0.25, //
                0.30, 0.80, //
                0.28, 0.76, //
                0.35, 0.74, //
                0.25, 0.72,
            ],
        )
    }

    #[test]
    fn quartimin_converges_on_correlated_clusters() {
        let out = rotate(&correlated_loadings(), &options()).unwrap();
        assert!(out.converged, "iterations {}", out.iterations);
    }

    #[test]
    fn criterion_decreases_from_identity() {
        let input = correlated_loadings();
        let (initial, _) = criterion(&input, 0.0);
        let out = rotate(&input, &options()).unwrap();
        let (final_value, _) = criterion(&out.loadings, 0.0);
        assert!(final_value <= initial + 1e-12, "{} vs {}", final_value, initial);
    }

    #[test]
    fn phi_is_a_correlation_matrix() {
        let out = rotate(&correlated_loadings(), &options()).unwrap();
        for f in 0..2 {
            assert!((out.factor_correlations[(f, f)] - 1.0).abs() < 1e-9);
        }
        let off = out.factor_correlations[(0, 1)];
        assert!(off.abs() <= 1.0);
        assert!((off - out.factor_correlations[(1, 0)]).abs() < 1e-12);
    }

    #[test]
    fn loadings_follow_the_reported_rotation() {
        let input = correlated_loadings();
        let out = rotate(&input, &options()).unwrap();
        let recomputed = &input * &out.rotation;
        assert!((&recomputed - &out.loadings).abs().max() < 1e-9);
    }

    #[test]
    fn iteration_cap_reports_non_convergence() {
        let tight = RotationOptions {
            tolerance: 1e-14,
            max_iterations: 1,
            ..options()
        };
        let out = rotate(&correlated_loadings(), &tight).unwrap();
        assert_eq!(out.iterations, 1);
    }
}
