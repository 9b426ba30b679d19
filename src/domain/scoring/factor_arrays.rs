//! Factor arrays: per-factor idealized Q sorts.
//!
//! Participant loadings weight each statement's ranks into a factor
//! score, scores are standardized to z, and the z order is mapped back
//! onto the forced-distribution grid.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, StatementId};
use crate::domain::qsort::QSortMatrix;
use crate::domain::rotation::RotatedSolution;

/// One factor's idealized Q sort: a z-score and a forced rank per
/// statement, indexed by statement order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorArray {
    factor: usize,
    z_scores: Vec<f64>,
    ranks: Vec<i32>,
}

impl FactorArray {
    pub(crate) fn from_scores(factor: usize, z_scores: Vec<f64>, ranks: Vec<i32>) -> Self {
        Self {
            factor,
            z_scores,
            ranks,
        }
    }

    /// Zero-based factor index.
    pub fn factor(&self) -> usize {
        self.factor
    }

    pub fn statement_count(&self) -> usize {
        self.z_scores.len()
    }

    pub fn z_score(&self, statement: StatementId) -> f64 {
        self.z_scores[statement.index()]
    }

    pub fn rank(&self, statement: StatementId) -> i32 {
        self.ranks[statement.index()]
    }

    pub fn z_scores(&self) -> &[f64] {
        &self.z_scores
    }

    pub fn ranks(&self) -> &[i32] {
        &self.ranks
    }

    /// Statement ids ordered by descending z-score, ties broken by
    /// original statement index for determinism.
    pub fn statements_by_z(&self) -> Vec<StatementId> {
        let mut order: Vec<usize> = (0..self.z_scores.len()).collect();
        order.sort_by(|&a, &b| {
            self.z_scores[b]
                .total_cmp(&self.z_scores[a])
                .then(a.cmp(&b))
        });
        order.into_iter().map(StatementId::new).collect()
    }
}

/// Builds one factor array per rotated factor.
///
/// # Errors
///
/// - `InvalidDimensions` if the solution's participant count differs from
///   the matrix
pub fn build_factor_arrays(
    matrix: &QSortMatrix,
    rotated: &RotatedSolution,
) -> Result<Vec<FactorArray>, DomainError> {
    if rotated.participant_count() != matrix.participant_count() {
        return Err(DomainError::new(
            ErrorCode::InvalidDimensions,
            format!(
                "Solution has {} participants, matrix has {}",
                rotated.participant_count(),
                matrix.participant_count()
            ),
        ));
    }

    let statement_count = matrix.statement_count();
    let grid_ranks = matrix.grid().ranks_descending();

    (0..rotated.factor_count())
        .map(|f| {
            let weights = participant_weights(rotated.factor_loadings(f));
            let scores: Vec<f64> = (0..statement_count)
                .map(|s| {
                    weights
                        .iter()
                        .enumerate()
                        .map(|(p, w)| w * matrix.rank(p, s) as f64)
                        .sum()
                })
                .collect();
            let z_scores = standardize(&scores);
            let ranks = ranks_from_z(&z_scores, &grid_ranks);
            Ok(FactorArray::from_scores(f, z_scores, ranks))
        })
        .collect()
}

/// Spearman-Brown participant weights, `l / (1 - l²)`.
///
/// Loadings are clamped just inside ±1 so a participant who defines a
/// factor perfectly cannot blow up the weighting.
fn participant_weights(loadings: &[f64]) -> Vec<f64> {
    loadings
        .iter()
        .map(|&l| {
            let l = l.clamp(-0.999, 0.999);
            l / (1.0 - l * l)
        })
        .collect()
}

fn standardize(scores: &[f64]) -> Vec<f64> {
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;
    let sd = variance.sqrt();
    if sd < f64::EPSILON {
        return vec![0.0; scores.len()];
    }
    scores.iter().map(|s| (s - mean) / sd).collect()
}

/// Maps z-ordered statements onto the grid's rank slots, highest z first,
/// ties broken by statement index.
fn ranks_from_z(z_scores: &[f64], grid_ranks: &[i32]) -> Vec<i32> {
    let mut order: Vec<usize> = (0..z_scores.len()).collect();
    order.sort_by(|&a, &b| z_scores[b].total_cmp(&z_scores[a]).then(a.cmp(&b)));

    let mut ranks = vec![0; z_scores.len()];
    for (slot, statement) in order.into_iter().enumerate() {
        ranks[statement] = grid_ranks[slot];
    }
    ranks
}
