//! Advisory factor-count guidance: Kaiser criterion, parallel analysis,
//! and the raw eigenvalue sequence for scree inspection.
//!
//! Guidance is never enforced; the study lead decides the factor count.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::DomainError;
use crate::domain::qsort::{CorrelationMatrix, QSortMatrix};

use super::pca;

/// Advisory factor-count signals returned alongside extraction results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorCountGuidance {
    /// Number of eigenvalues above 1.0.
    pub kaiser_count: usize,
    /// Factors whose eigenvalue exceeds the mean eigenvalue of permuted
    /// data at the same position.
    pub parallel_count: usize,
    /// Observed eigenvalues, descending, for scree inspection.
    pub eigenvalues: Vec<f64>,
    /// Mean permuted eigenvalues per position (the parallel-analysis
    /// reference line).
    pub random_mean_eigenvalues: Vec<f64>,
    /// Number of random permutations behind the reference line.
    pub permutations: usize,
}

/// Computes factor-count guidance for a dataset.
///
/// Parallel analysis permutes each participant's ranks independently
/// (which preserves the forced distribution) `permutations` times and
/// compares the observed eigenvalue sequence against the permuted mean.
/// A seed makes the reference line reproducible.
pub fn advise_factor_count(
    matrix: &QSortMatrix,
    correlation: &CorrelationMatrix,
    permutations: usize,
    seed: Option<u64>,
) -> Result<FactorCountGuidance, DomainError> {
    let observed = pca::eigenvalues_descending(correlation);
    let kaiser_count = observed.iter().filter(|&&ev| ev > 1.0).count();

    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let mut sums = vec![0.0_f64; observed.len()];
    for _ in 0..permutations {
        let permuted_rows: Vec<Vec<i32>> = matrix
            .rows()
            .iter()
            .map(|row| {
                let mut shuffled = row.clone();
                shuffled.shuffle(&mut rng);
                shuffled
            })
            .collect();
        // Shuffling within a row preserves its bucket counts, so this
        // always revalidates cleanly.
        let permuted = QSortMatrix::new(matrix.grid().clone(), permuted_rows)?;
        let permuted_corr = CorrelationMatrix::from_qsorts(&permuted)?;
        for (slot, ev) in sums.iter_mut().zip(pca::eigenvalues_descending(&permuted_corr)) {
            *slot += ev;
        }
    }

    let random_mean_eigenvalues: Vec<f64> =
        sums.into_iter().map(|s| s / permutations.max(1) as f64).collect();
    let parallel_count = observed
        .iter()
        .zip(&random_mean_eigenvalues)
        .take_while(|(obs, rand)| obs > rand)
        .count();

    Ok(FactorCountGuidance {
        kaiser_count,
        parallel_count,
        eigenvalues: observed,
        random_mean_eigenvalues,
        permutations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::qsort::{DistributionGrid, GridColumn};

    fn dataset() -> (QSortMatrix, CorrelationMatrix) {
        let grid = DistributionGrid::new(vec![
            GridColumn::new(-2, 1),
            GridColumn::new(-1, 2),
            GridColumn::new(0, 3),
            GridColumn::new(1, 2),
            GridColumn::new(2, 1),
        ])
        .unwrap();
        let rows = vec![
            vec![-2, -1, -1, 0, 0, 0, 1, 1, 2],
            vec![-2, -1, -1, 0, 0, 0, 1, 2, 1],
            vec![-1, -2, -1, 0, 0, 0, 1, 1, 2],
            vec![2, 1, 1, 0, 0, 0, -1, -1, -2],
            vec![1, 2, 1, 0, 0, 0, -1, -2, -1],
            vec![0, 1, -1, 2, -2, 0, 1, 0, -1],
        ];
        let matrix = QSortMatrix::new(grid, rows).unwrap();
        let corr = CorrelationMatrix::from_qsorts(&matrix).unwrap();
        (matrix, corr)
    }

    #[test]
    fn kaiser_counts_eigenvalues_above_one() {
        let (matrix, corr) = dataset();
        let guidance = advise_factor_count(&matrix, &corr, 20, Some(7)).unwrap();
        let expected = guidance.eigenvalues.iter().filter(|&&ev| ev > 1.0).count();
        assert_eq!(guidance.kaiser_count, expected);
        assert!(guidance.kaiser_count >= 1);
    }

    #[test]
    fn seeded_guidance_is_reproducible() {
        let (matrix, corr) = dataset();
        let a = advise_factor_count(&matrix, &corr, 25, Some(42)).unwrap();
        let b = advise_factor_count(&matrix, &corr, 25, Some(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn reference_line_has_one_entry_per_eigenvalue() {
        let (matrix, corr) = dataset();
        let guidance = advise_factor_count(&matrix, &corr, 10, Some(1)).unwrap();
        assert_eq!(guidance.random_mean_eigenvalues.len(), guidance.eigenvalues.len());
        assert_eq!(guidance.permutations, 10);
    }

    #[test]
    fn strong_first_factor_beats_the_reference_line() {
        let (matrix, corr) = dataset();
        let guidance = advise_factor_count(&matrix, &corr, 30, Some(3)).unwrap();
        assert!(guidance.parallel_count >= 1);
    }
}
