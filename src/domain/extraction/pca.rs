//! Principal components extraction via symmetric eigen-decomposition.

use nalgebra::SymmetricEigen;

use crate::domain::foundation::DomainError;
use crate::domain::qsort::CorrelationMatrix;

use super::{ExtractionMethod, ExtractionOptions, FactorSolution};

pub(super) fn extract(
    correlation: &CorrelationMatrix,
    options: &ExtractionOptions,
) -> Result<FactorSolution, DomainError> {
    let n = correlation.size();
    let pairs = eigen_pairs(correlation);

    let mut factors = Vec::with_capacity(options.factor_count);
    let mut eigenvalues = Vec::with_capacity(options.factor_count);
    for (eigenvalue, vector) in pairs.into_iter().take(options.factor_count) {
        if eigenvalue <= options.residual_variance_floor {
            break;
        }
        let scale = eigenvalue.sqrt();
        factors.push(vector.iter().map(|v| v * scale).collect());
        eigenvalues.push(eigenvalue);
    }

    Ok(FactorSolution::new(
        ExtractionMethod::PrincipalComponents,
        n,
        factors,
        eigenvalues,
        true,
        1,
    ))
}

/// Full spectrum as (eigenvalue, eigenvector) pairs, descending by
/// eigenvalue. Negative eigenvalues (floating-point noise on a
/// correlation matrix) are clamped to zero.
pub(super) fn eigen_pairs(correlation: &CorrelationMatrix) -> Vec<(f64, Vec<f64>)> {
    let decomposition = SymmetricEigen::new(correlation.to_dmatrix());
    let mut pairs: Vec<(f64, Vec<f64>)> = decomposition
        .eigenvalues
        .iter()
        .enumerate()
        .map(|(i, &ev)| {
            let vector = decomposition.eigenvectors.column(i).iter().cloned().collect();
            (ev.max(0.0), vector)
        })
        .collect();
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));
    pairs
}

/// Eigenvalues only, descending. Used by the factor-count guidance.
pub(super) fn eigenvalues_descending(correlation: &CorrelationMatrix) -> Vec<f64> {
    eigen_pairs(correlation).into_iter().map(|(ev, _)| ev).collect()
}
