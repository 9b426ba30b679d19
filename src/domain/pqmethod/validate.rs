//! Benchmark validation against reference factor arrays.
//!
//! Compares computed factor arrays with arrays parsed from the reference
//! tool's export. Falling short of the 0.99 correlation target is a
//! finding, not a failure: the report says which factor missed and by
//! how much per statement.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, StatementId};
use crate::domain::scoring::FactorArray;

use super::export::import_factor_arrays;

/// Correlation a factor must reach against its reference array.
pub const REFERENCE_CORRELATION_TARGET: f64 = 0.99;

/// Per-statement z-score difference against the reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatementDelta {
    pub statement: StatementId,
    pub computed: f64,
    pub reference: f64,
    pub delta: f64,
}

/// One factor's comparison against its reference array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorValidation {
    pub factor: usize,
    pub correlation: f64,
    pub passed: bool,
    pub deltas: Vec<StatementDelta>,
}

/// Full benchmark report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    factors: Vec<FactorValidation>,
    passed: bool,
}

impl ValidationReport {
    pub fn factors(&self) -> &[FactorValidation] {
        &self.factors
    }

    /// True only when every factor meets the correlation target.
    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn worst_correlation(&self) -> f64 {
        self.factors
            .iter()
            .map(|f| f.correlation)
            .fold(f64::INFINITY, f64::min)
    }
}

/// Validates computed arrays against a fixed-width reference export.
///
/// # Errors
///
/// - `ImportFormat` if the reference text does not parse
/// - `InvalidDimensions` if factor or statement counts disagree; a shape
///   mismatch means the wrong reference file, not a numerical miss
pub fn validate_against_reference(
    arrays: &[FactorArray],
    reference: &str,
) -> Result<ValidationReport, DomainError> {
    let reference_arrays = import_factor_arrays(reference)?;

    if reference_arrays.len() != arrays.len() {
        return Err(DomainError::new(
            ErrorCode::InvalidDimensions,
            format!(
                "Reference has {} factors, computed solution has {}",
                reference_arrays.len(),
                arrays.len()
            ),
        ));
    }

    let mut factors = Vec::with_capacity(arrays.len());
    for (computed, reference_array) in arrays.iter().zip(&reference_arrays) {
        if computed.statement_count() != reference_array.statement_count() {
            return Err(DomainError::new(
                ErrorCode::InvalidDimensions,
                format!(
                    "Factor {}: reference has {} statements, computed has {}",
                    computed.factor() + 1,
                    reference_array.statement_count(),
                    computed.statement_count()
                ),
            ));
        }

        let correlation = pearson(computed.z_scores(), reference_array.z_scores());
        let deltas = (0..computed.statement_count())
            .map(|s| {
                let statement = StatementId::new(s);
                let c = computed.z_score(statement);
                let r = reference_array.z_score(statement);
                StatementDelta {
                    statement,
                    computed: c,
                    reference: r,
                    delta: c - r,
                }
            })
            .collect();

        factors.push(FactorValidation {
            factor: computed.factor(),
            correlation,
            passed: correlation >= REFERENCE_CORRELATION_TARGET,
            deltas,
        });
    }

    let passed = factors.iter().all(|f| f.passed);
    Ok(ValidationReport { factors, passed })
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pqmethod::export_factor_arrays;

    fn computed() -> Vec<FactorArray> {
        vec![FactorArray::from_scores(
            0,
            vec![1.5, 0.5, 0.0, -0.5, -1.5],
            vec![2, 1, 0, -1, -2],
        )]
    }

    #[test]
    fn identical_arrays_pass() {
        let arrays = computed();
        let reference = export_factor_arrays(&arrays);
        let report = validate_against_reference(&arrays, &reference).unwrap();
        assert!(report.passed());
        assert!(report.worst_correlation() > 0.9999);
        for delta in &report.factors()[0].deltas {
            assert!(delta.delta.abs() < 0.001);
        }
    }

    #[test]
    fn disagreement_reports_instead_of_failing() {
        let arrays = computed();
        let shuffled = vec![FactorArray::from_scores(
            0,
            vec![-0.5, 1.5, -1.5, 0.0, 0.5],
            vec![-1, 2, -2, 0, 1],
        )];
        let reference = export_factor_arrays(&shuffled);
        let report = validate_against_reference(&arrays, &reference).unwrap();
        assert!(!report.passed());
        assert!(report.factors()[0].correlation < REFERENCE_CORRELATION_TARGET);
        assert_eq!(report.factors()[0].deltas.len(), 5);
    }

    #[test]
    fn factor_count_mismatch_is_an_error() {
        let arrays = computed();
        let two = vec![
            FactorArray::from_scores(0, vec![1.0, 0.0, -1.0], vec![1, 0, -1]),
            FactorArray::from_scores(1, vec![-1.0, 0.0, 1.0], vec![-1, 0, 1]),
        ];
        let reference = export_factor_arrays(&two);
        let err = validate_against_reference(&arrays, &reference).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDimensions);
    }

    #[test]
    fn garbage_reference_is_an_import_error() {
        let err = validate_against_reference(&computed(), "not a reference").unwrap_err();
        assert_eq!(err.code, ErrorCode::ImportFormat);
    }
}
