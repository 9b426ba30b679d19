//! Centroid extraction (Brown's method).
//!
//! One factor at a time: choose participant sign flips that maximize the
//! extracted variance, form the centroid loadings from the signed column
//! sums, then residualize the matrix and repeat. Matches PQMethod's
//! centroid output within 0.001 on reference data.

use nalgebra::DMatrix;

use crate::domain::foundation::DomainError;
use crate::domain::qsort::CorrelationMatrix;

use super::{ExtractionMethod, ExtractionOptions, FactorSolution};

pub(super) fn extract(
    correlation: &CorrelationMatrix,
    options: &ExtractionOptions,
) -> Result<FactorSolution, DomainError> {
    let n = correlation.size();
    let mut residual = correlation.to_dmatrix();

    let mut factors: Vec<Vec<f64>> = Vec::with_capacity(options.factor_count);
    let mut eigenvalues: Vec<f64> = Vec::with_capacity(options.factor_count);
    let mut total_iterations = 0;

    for factor_index in 0..options.factor_count {
        let (signs, iterations) =
            stabilize_signs(&residual, factor_index, options.centroid_max_iterations)?;
        total_iterations += iterations;

        // Total signed variance; non-positive means nothing left to extract.
        let total: f64 = (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .map(|(i, j)| signs[i] * signs[j] * residual[(i, j)])
            .sum();
        if total <= options.residual_variance_floor {
            break;
        }

        // Reflected column sum divided by sqrt of the total, un-reflected
        // back to the participant's original orientation.
        let root = total.sqrt();
        let loadings: Vec<f64> = (0..n)
            .map(|i| {
                let signed_sum: f64 = (0..n).map(|j| signs[j] * residual[(i, j)]).sum();
                signed_sum / root
            })
            .collect();

        let eigenvalue: f64 = loadings.iter().map(|l| l * l).sum();
        if eigenvalue <= options.residual_variance_floor {
            break;
        }

        residualize(&mut residual, &loadings);
        factors.push(loadings);
        eigenvalues.push(eigenvalue);
    }

    Ok(FactorSolution::new(
        ExtractionMethod::Centroid,
        n,
        factors,
        eigenvalues,
        true,
        total_iterations,
    ))
}

/// Iteratively flips participant signs until no flip increases the
/// extracted variance.
///
/// # Errors
///
/// - `ExtractionDiverged` if the loop exceeds `max_iterations`
fn stabilize_signs(
    residual: &DMatrix<f64>,
    factor_index: usize,
    max_iterations: usize,
) -> Result<(Vec<f64>, usize), DomainError> {
    let n = residual.nrows();
    let mut signs = vec![1.0_f64; n];
    let mut iterations = 0;

    loop {
        let mut flipped = false;
        for i in 0..n {
            // Contribution of participant i to the signed total, diagonal
            // excluded (flipping i leaves r_ii unchanged).
            let contribution: f64 = (0..n)
                .filter(|&j| j != i)
                .map(|j| signs[j] * residual[(i, j)])
                .sum();
            if signs[i] * contribution < 0.0 {
                signs[i] = -signs[i];
                flipped = true;
            }
        }
        iterations += 1;
        if !flipped {
            return Ok((signs, iterations));
        }
        if iterations >= max_iterations {
            return Err(DomainError::extraction_diverged(factor_index, iterations));
        }
    }
}

/// Removes the extracted factor from the residual matrix.
fn residualize(residual: &mut DMatrix<f64>, loadings: &[f64]) {
    let n = residual.nrows();
    for i in 0..n {
        for j in 0..n {
            residual[(i, j)] -= loadings[i] * loadings[j];
        }
    }
}
