//! Statistical outputs derived from a rotated solution: factor arrays,
//! distinguishing and consensus statements, factor correlations, and
//! crib sheets.

mod crib_sheet;
mod distinguishing;
mod factor_arrays;

use serde::{Deserialize, Serialize};

pub use crib_sheet::{build_crib_sheets, CribEntry, CribSheet};
pub use distinguishing::{
    compare_statements, ConsensusStatement, DistinguishingStatement, PairwiseComparison,
    SignificanceLevel, SignificanceThresholds, StatementComparison,
};
pub use factor_arrays::{build_factor_arrays, FactorArray};

use crate::domain::foundation::DomainError;
use crate::domain::qsort::QSortMatrix;
use crate::domain::rotation::RotatedSolution;

/// The full derived-output bundle for one rotated solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalOutputs {
    factor_arrays: Vec<FactorArray>,
    comparison: Option<StatementComparison>,
    crib_sheets: Vec<CribSheet>,
    /// Present for oblique solutions only, row-major.
    factor_correlations: Option<Vec<Vec<f64>>>,
}

impl StatisticalOutputs {
    pub fn factor_arrays(&self) -> &[FactorArray] {
        &self.factor_arrays
    }

    /// `None` for single-factor solutions, where pairwise comparison is
    /// undefined.
    pub fn comparison(&self) -> Option<&StatementComparison> {
        self.comparison.as_ref()
    }

    pub fn crib_sheets(&self) -> &[CribSheet] {
        &self.crib_sheets
    }

    pub fn factor_correlations(&self) -> Option<&[Vec<f64>]> {
        self.factor_correlations.as_deref()
    }
}

/// Derives every statistical output from a rotated solution.
///
/// Pure with respect to its inputs; the session layer calls this on
/// preview and on confirmation and the numbers agree.
pub fn generate_outputs(
    matrix: &QSortMatrix,
    rotated: &RotatedSolution,
    thresholds: SignificanceThresholds,
) -> Result<StatisticalOutputs, DomainError> {
    let factor_arrays = build_factor_arrays(matrix, rotated)?;
    let comparison = if factor_arrays.len() >= 2 {
        Some(compare_statements(&factor_arrays, rotated, thresholds)?)
    } else {
        None
    };
    let crib_sheets = build_crib_sheets(&factor_arrays);
    let factor_correlations = rotated.factor_correlations().map(|phi| phi.to_vec());

    Ok(StatisticalOutputs {
        factor_arrays,
        comparison,
        crib_sheets,
        factor_correlations,
    })
}
