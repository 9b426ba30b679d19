//! Participant correlation matrix built from Q-sort ranks.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode};

use super::QSortMatrix;

/// Symmetric participant × participant Pearson correlation matrix.
///
/// # Invariants
///
/// - Symmetric with unit diagonal
/// - Every entry in [-1, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    size: usize,
    /// Row-major entries; kept as a flat vec for serde, wrapped into a
    /// `DMatrix` for the eigen work.
    entries: Vec<f64>,
}

impl CorrelationMatrix {
    /// Builds the correlation matrix from a validated Q-sort matrix.
    ///
    /// Pure and deterministic: correlates each participant pair's
    /// statement-rank vectors.
    ///
    /// # Errors
    ///
    /// - `InsufficientData` if fewer than 2 participants
    pub fn from_qsorts(matrix: &QSortMatrix) -> Result<Self, DomainError> {
        let n = matrix.participant_count();
        if n < 2 {
            return Err(DomainError::new(
                ErrorCode::InsufficientData,
                format!("Correlation needs at least 2 participants, got {}", n),
            )
            .with_detail("participants", n.to_string()));
        }

        let m = matrix.statement_count() as f64;
        let rows = matrix.rows();

        // Per-participant mean and centered vectors. The forced
        // distribution guarantees nonzero variance (grids have at least
        // two distinct rank values).
        let centered: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| {
                let mean = row.iter().map(|&r| r as f64).sum::<f64>() / m;
                row.iter().map(|&r| r as f64 - mean).collect()
            })
            .collect();
        let norms: Vec<f64> = centered
            .iter()
            .map(|v| v.iter().map(|x| x * x).sum::<f64>().sqrt())
            .collect();

        let mut entries = vec![0.0; n * n];
        for i in 0..n {
            entries[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let dot: f64 = centered[i]
                    .iter()
                    .zip(&centered[j])
                    .map(|(a, b)| a * b)
                    .sum();
                let r = (dot / (norms[i] * norms[j])).clamp(-1.0, 1.0);
                entries[i * n + j] = r;
                entries[j * n + i] = r;
            }
        }

        Ok(Self { size: n, entries })
    }

    /// Number of participants.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Correlation between participants `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.entries[i * self.size + j]
    }

    /// Sum of the diagonal (equals the participant count by construction).
    pub fn trace(&self) -> f64 {
        (0..self.size).map(|i| self.get(i, i)).sum()
    }

    /// The matrix as a `DMatrix` for eigen-decomposition.
    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.size, self.size, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::qsort::{DistributionGrid, GridColumn};

    fn grid() -> DistributionGrid {
        DistributionGrid::new(vec![
            GridColumn::new(-1, 2),
            GridColumn::new(0, 1),
            GridColumn::new(1, 2),
        ])
        .unwrap()
    }

    fn matrix(rows: Vec<Vec<i32>>) -> QSortMatrix {
        QSortMatrix::new(grid(), rows).unwrap()
    }

    #[test]
    fn identical_sorts_correlate_perfectly() {
        let m = matrix(vec![vec![-1, -1, 0, 1, 1], vec![-1, -1, 0, 1, 1]]);
        let corr = CorrelationMatrix::from_qsorts(&m).unwrap();
        assert!((corr.get(0, 1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reversed_sorts_correlate_negatively() {
        let m = matrix(vec![vec![-1, -1, 0, 1, 1], vec![1, 1, 0, -1, -1]]);
        let corr = CorrelationMatrix::from_qsorts(&m).unwrap();
        assert!((corr.get(0, 1) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn diagonal_is_unit() {
        let m = matrix(vec![vec![-1, -1, 0, 1, 1], vec![0, 1, -1, 1, -1]]);
        let corr = CorrelationMatrix::from_qsorts(&m).unwrap();
        for i in 0..corr.size() {
            assert_eq!(corr.get(i, i), 1.0);
        }
    }

    #[test]
    fn matrix_is_symmetric_and_bounded() {
        let m = matrix(vec![
            vec![-1, -1, 0, 1, 1],
            vec![0, 1, -1, 1, -1],
            vec![1, 0, 1, -1, -1],
        ]);
        let corr = CorrelationMatrix::from_qsorts(&m).unwrap();
        for i in 0..corr.size() {
            for j in 0..corr.size() {
                assert_eq!(corr.get(i, j), corr.get(j, i));
                assert!(corr.get(i, j).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn single_participant_is_insufficient() {
        let m = matrix(vec![vec![-1, -1, 0, 1, 1]]);
        let err = CorrelationMatrix::from_qsorts(&m).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientData);
    }

    #[test]
    fn trace_equals_participant_count() {
        let m = matrix(vec![
            vec![-1, -1, 0, 1, 1],
            vec![0, 1, -1, 1, -1],
            vec![1, 0, 1, -1, -1],
        ]);
        let corr = CorrelationMatrix::from_qsorts(&m).unwrap();
        assert!((corr.trace() - 3.0).abs() < 1e-12);
    }
}
