//! Orthomax family: iterative pairwise-plane rotation with Kaiser
//! normalization. Varimax is gamma = 1, quartimax is gamma = 0.

use nalgebra::DMatrix;

use crate::domain::foundation::DomainError;

use super::RotationOptions;

pub(super) struct OrthomaxOutcome {
    pub loadings: DMatrix<f64>,
    pub rotation: DMatrix<f64>,
    pub converged: bool,
    pub iterations: usize,
}

/// Rotates `loadings` (participants × factors) to the orthomax criterion.
///
/// Sweeps every factor pair per iteration, choosing the plane angle that
/// maximizes the criterion, until the largest angle in a sweep drops
/// below `options.tolerance` or the sweep cap is hit. Rows are Kaiser
/// normalized for the duration of the optimization; the returned loadings
/// are de-normalized and satisfy `loadings = input * rotation` exactly.
pub(super) fn rotate(
    loadings: &DMatrix<f64>,
    gamma: f64,
    options: &RotationOptions,
) -> Result<OrthomaxOutcome, DomainError> {
    let n = loadings.nrows();
    let k = loadings.ncols();

    // Kaiser normalization: weight every participant equally during the
    // optimization. Zero-communality rows stay zero.
    let communalities: Vec<f64> = (0..n)
        .map(|p| loadings.row(p).iter().map(|l| l * l).sum::<f64>().sqrt())
        .collect();
    let mut working = loadings.clone();
    for p in 0..n {
        if communalities[p] > 0.0 {
            for f in 0..k {
                working[(p, f)] /= communalities[p];
            }
        }
    }

    let mut rotation = DMatrix::identity(k, k);
    let mut converged = false;
    let mut iterations = 0;

    while iterations < options.max_iterations {
        iterations += 1;
        let mut largest_angle: f64 = 0.0;

        for p in 0..k {
            for q in (p + 1)..k {
                let angle = plane_angle(&working, p, q, gamma);
                if angle.abs() > largest_angle {
                    largest_angle = angle.abs();
                }
                if angle.abs() > f64::EPSILON {
                    apply_plane_rotation(&mut working, p, q, angle);
                    apply_plane_rotation(&mut rotation, p, q, angle);
                }
            }
        }

        if largest_angle < options.tolerance {
            converged = true;
            break;
        }
    }

    // De-normalize rows. Because normalization is a row scaling, the
    // accumulated rotation applies to the raw loadings unchanged.
    let rotated = loadings * &rotation;

    Ok(OrthomaxOutcome {
        loadings: rotated,
        rotation,
        converged,
        iterations,
    })
}

/// Optimal orthomax angle for the (p, q) plane.
fn plane_angle(loadings: &DMatrix<f64>, p: usize, q: usize, gamma: f64) -> f64 {
    let n = loadings.nrows() as f64;
    let mut a = 0.0;
    let mut b = 0.0;
    let mut c = 0.0;
    let mut d = 0.0;

    for row in 0..loadings.nrows() {
        let x = loadings[(row, p)];
        let y = loadings[(row, q)];
        let u = x * x - y * y;
        let v = 2.0 * x * y;
        a += u;
        b += v;
        c += u * u - v * v;
        d += 2.0 * u * v;
    }

    let numerator = d - gamma * 2.0 * a * b / n;
    let denominator = c - gamma * (a * a - b * b) / n;
    0.25 * numerator.atan2(denominator)
}

/// In-place Givens rotation of columns p and q.
fn apply_plane_rotation(matrix: &mut DMatrix<f64>, p: usize, q: usize, angle: f64) {
    let (sin, cos) = angle.sin_cos();
    for row in 0..matrix.nrows() {
        let x = matrix[(row, p)];
        let y = matrix[(row, q)];
        matrix[(row, p)] = cos * x + sin * y;
        matrix[(row, q)] = -sin * x + cos * y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> RotationOptions {
        RotationOptions {
            tolerance: 1e-6,
            max_iterations: 50,
            promax_kappa: 4.0,
            oblimin_gamma: 0.0,
        }
    }

    /// Two clean clusters mixed by a 45 degree rotation; varimax must
    /// recover simple structure.
    fn mixed_loadings() -> DMatrix<f64> {
        let simple = DMatrix::from_row_slice(
            6,
            2,
            &[
                0.8, 0.05, //
                0.75, 0.1, //
                0.7, 0.0, //
                0.05, 0.8, //
                0.0, 0.75, //
                0.1, 0.7,
            ],
        );
        let theta = std::f64::consts::FRAC_PI_4;
        let mix =
            DMatrix::from_row_slice(2, 2, &[theta.cos(), -theta.sin(), theta.sin(), theta.cos()]);
        simple * mix
    }

    #[test]
    fn varimax_recovers_simple_structure() {
        let out = rotate(&mixed_loadings(), 1.0, &options()).unwrap();
        assert!(out.converged);
        // Every row should load essentially on one factor.
        for p in 0..out.loadings.nrows() {
            let a = out.loadings[(p, 0)].abs();
            let b = out.loadings[(p, 1)].abs();
            let (hi, lo) = if a > b { (a, b) } else { (b, a) };
            assert!(hi > 0.6, "row {} hi {}", p, hi);
            assert!(lo < 0.2, "row {} lo {}", p, lo);
        }
    }

    #[test]
    fn rotation_matrix_is_orthogonal() {
        let out = rotate(&mixed_loadings(), 1.0, &options()).unwrap();
        let gram = out.rotation.transpose() * &out.rotation;
        let deviation = (&gram - DMatrix::identity(2, 2)).abs().max();
        assert!(deviation < 1e-9, "deviation {}", deviation);
    }

    #[test]
    fn output_equals_input_times_rotation() {
        let input = mixed_loadings();
        let out = rotate(&input, 1.0, &options()).unwrap();
        let recomputed = &input * &out.rotation;
        assert!((&recomputed - &out.loadings).abs().max() < 1e-12);
    }

    #[test]
    fn varimax_is_idempotent_on_optimal_solution() {
        let tight = RotationOptions {
            tolerance: 1e-8,
            ..options()
        };
        let first = rotate(&mixed_loadings(), 1.0, &tight).unwrap();
        let second = rotate(&first.loadings, 1.0, &tight).unwrap();
        let drift = (&second.loadings - &first.loadings).abs().max();
        assert!(drift < 1e-6, "drift {}", drift);
    }

    #[test]
    fn quartimax_also_converges() {
        let out = rotate(&mixed_loadings(), 0.0, &options()).unwrap();
        assert!(out.converged);
        assert!(out.iterations <= 50);
    }

    #[test]
    fn sweep_cap_reports_non_convergence() {
        let tight = RotationOptions {
            tolerance: 1e-16,
            max_iterations: 1,
            promax_kappa: 4.0,
            oblimin_gamma: 0.0,
        };
        let out = rotate(&mixed_loadings(), 1.0, &tight).unwrap();
        assert!(!out.converged);
        assert_eq!(out.iterations, 1);
    }
}
