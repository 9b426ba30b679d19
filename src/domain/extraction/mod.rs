//! Factor extraction: centroid (Brown) and principal components, with
//! advisory factor-count guidance.

mod centroid;
mod guidance;
mod pca;

pub use guidance::{advise_factor_count, FactorCountGuidance};

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::qsort::CorrelationMatrix;

/// Extraction strategy.
///
/// A flat variant set rather than a trait hierarchy so the numeric
/// kernels stay independently testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Brown's centroid method, the Q-methodology tradition.
    Centroid,
    /// Principal components via eigen-decomposition.
    PrincipalComponents,
}

impl ExtractionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ExtractionMethod::Centroid => "centroid",
            ExtractionMethod::PrincipalComponents => "principal_components",
        }
    }
}

/// Tunable extraction parameters; defaults come from `AnalysisConfig`.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionOptions {
    /// Number of factors to extract.
    pub factor_count: usize,
    /// Cap on centroid sign-flip iterations per factor.
    pub centroid_max_iterations: usize,
    /// Stop extracting once a factor's eigenvalue falls below this floor.
    pub residual_variance_floor: f64,
}

/// Immutable result of factor extraction.
///
/// Loadings are stored column-major per factor; each column's sign is
/// normalized so its largest-magnitude loading is positive, which keeps
/// repeated runs on identical input byte-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorSolution {
    method: ExtractionMethod,
    participant_count: usize,
    /// `factors[f][p]` is participant p's loading on factor f.
    factors: Vec<Vec<f64>>,
    eigenvalues: Vec<f64>,
    explained_variance: Vec<f64>,
    converged: bool,
    iterations: usize,
}

impl FactorSolution {
    pub(crate) fn new(
        method: ExtractionMethod,
        participant_count: usize,
        factors: Vec<Vec<f64>>,
        eigenvalues: Vec<f64>,
        converged: bool,
        iterations: usize,
    ) -> Self {
        let explained_variance = eigenvalues
            .iter()
            .map(|ev| ev / participant_count as f64)
            .collect();
        let mut solution = Self {
            method,
            participant_count,
            factors,
            eigenvalues,
            explained_variance,
            converged,
            iterations,
        };
        solution.normalize_signs();
        solution
    }

    /// Flips each factor so its largest-magnitude loading is positive.
    fn normalize_signs(&mut self) {
        for column in &mut self.factors {
            let dominant = column
                .iter()
                .cloned()
                .max_by(|a, b| a.abs().total_cmp(&b.abs()));
            if let Some(value) = dominant {
                if value < 0.0 {
                    for loading in column.iter_mut() {
                        *loading = -*loading;
                    }
                }
            }
        }
    }

    pub fn method(&self) -> ExtractionMethod {
        self.method
    }

    /// Number of extracted factors (may be below the requested count if
    /// the residual variance floor cut extraction short).
    pub fn factor_count(&self) -> usize {
        self.factors.len()
    }

    pub fn participant_count(&self) -> usize {
        self.participant_count
    }

    /// Loading of participant `p` on factor `f`.
    pub fn loading(&self, participant: usize, factor: usize) -> f64 {
        self.factors[factor][participant]
    }

    /// One factor's loadings across participants.
    pub fn factor_loadings(&self, factor: usize) -> &[f64] {
        &self.factors[factor]
    }

    /// Loadings as participant-major rows.
    pub fn loading_rows(&self) -> Vec<Vec<f64>> {
        (0..self.participant_count)
            .map(|p| self.factors.iter().map(|col| col[p]).collect())
            .collect()
    }

    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Share of total variance explained per factor.
    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

/// Extracts factors from a correlation matrix.
///
/// # Errors
///
/// - `ValidationFailed` if `factor_count` is zero or exceeds the
///   participant count
/// - `ExtractionDiverged` if centroid sign flipping exceeds its cap
pub fn extract(
    correlation: &CorrelationMatrix,
    method: ExtractionMethod,
    options: &ExtractionOptions,
) -> Result<FactorSolution, DomainError> {
    if options.factor_count == 0 {
        return Err(DomainError::new(
            ErrorCode::ValidationFailed,
            "Factor count must be at least 1",
        ));
    }
    if options.factor_count > correlation.size() {
        return Err(DomainError::new(
            ErrorCode::ValidationFailed,
            format!(
                "Cannot extract {} factors from {} participants",
                options.factor_count,
                correlation.size()
            ),
        )
        .with_detail("factor_count", options.factor_count.to_string())
        .with_detail("participants", correlation.size().to_string()));
    }

    match method {
        ExtractionMethod::Centroid => centroid::extract(correlation, options),
        ExtractionMethod::PrincipalComponents => pca::extract(correlation, options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::qsort::{DistributionGrid, GridColumn, QSortMatrix};

    fn correlation() -> CorrelationMatrix {
        let grid = DistributionGrid::new(vec![
            GridColumn::new(-1, 2),
            GridColumn::new(0, 1),
            GridColumn::new(1, 2),
        ])
        .unwrap();
        let matrix = QSortMatrix::new(
            grid,
            vec![
                vec![-1, -1, 0, 1, 1],
                vec![-1, -1, 1, 0, 1],
                vec![1, 1, 0, -1, -1],
                vec![0, 1, -1, 1, -1],
            ],
        )
        .unwrap();
        CorrelationMatrix::from_qsorts(&matrix).unwrap()
    }

    fn options(k: usize) -> ExtractionOptions {
        ExtractionOptions {
            factor_count: k,
            centroid_max_iterations: 100,
            residual_variance_floor: 1e-9,
        }
    }

    #[test]
    fn rejects_zero_factor_count() {
        let err = extract(&correlation(), ExtractionMethod::Centroid, &options(0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn rejects_more_factors_than_participants() {
        let err =
            extract(&correlation(), ExtractionMethod::PrincipalComponents, &options(9))
                .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn sign_normalization_makes_dominant_loading_positive() {
        for method in [ExtractionMethod::Centroid, ExtractionMethod::PrincipalComponents] {
            let solution = extract(&correlation(), method, &options(2)).unwrap();
            for f in 0..solution.factor_count() {
                let dominant = solution
                    .factor_loadings(f)
                    .iter()
                    .cloned()
                    .max_by(|a, b| a.abs().total_cmp(&b.abs()))
                    .unwrap();
                assert!(dominant >= 0.0, "{} factor {}", method.name(), f);
            }
        }
    }

    #[test]
    fn extraction_is_deterministic() {
        let a = extract(&correlation(), ExtractionMethod::Centroid, &options(2)).unwrap();
        let b = extract(&correlation(), ExtractionMethod::Centroid, &options(2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn loading_rows_transpose_matches_columns() {
        let solution =
            extract(&correlation(), ExtractionMethod::PrincipalComponents, &options(2)).unwrap();
        let rows = solution.loading_rows();
        assert_eq!(rows.len(), solution.participant_count());
        assert_eq!(rows[1][0], solution.loading(1, 0));
    }
}
