//! Validated Q-sort response matrix.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::foundation::{DomainError, ErrorCode, ParticipantId};

use super::DistributionGrid;

/// Participants × statements integer ranks, validated against the grid.
///
/// # Invariants
///
/// - Every row has exactly `grid.statement_count()` entries
/// - Every row's per-rank counts match the grid's column capacities
///
/// Both are enforced at construction, so downstream math never sees a
/// malformed sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QSortMatrix {
    grid: DistributionGrid,
    rows: Vec<Vec<i32>>,
}

impl QSortMatrix {
    /// Creates a matrix from participant rows.
    ///
    /// # Errors
    ///
    /// - `InsufficientData` if no rows are supplied
    /// - `InvalidDimensions` if a row's length differs from the grid
    /// - `DistributionMismatch` if a row's rank counts violate the grid
    pub fn new(grid: DistributionGrid, rows: Vec<Vec<i32>>) -> Result<Self, DomainError> {
        if rows.is_empty() {
            return Err(DomainError::new(
                ErrorCode::InsufficientData,
                "A Q-sort matrix needs at least one participant row",
            ));
        }

        let expected_len = grid.statement_count();
        for (p, row) in rows.iter().enumerate() {
            if row.len() != expected_len {
                return Err(DomainError::new(
                    ErrorCode::InvalidDimensions,
                    format!(
                        "Participant {} sorted {} statements, grid holds {}",
                        p + 1,
                        row.len(),
                        expected_len
                    ),
                )
                .with_detail("participant", (p + 1).to_string())
                .with_detail("expected", expected_len.to_string())
                .with_detail("actual", row.len().to_string()));
            }

            let mut counts: HashMap<i32, usize> = HashMap::new();
            for &rank in row {
                *counts.entry(rank).or_insert(0) += 1;
            }
            if !grid.matches_counts(&counts) {
                return Err(DomainError::distribution_mismatch(
                    p,
                    format!(
                        "Participant {} rank counts do not match the forced distribution",
                        p + 1
                    ),
                ));
            }
        }

        Ok(Self { grid, rows })
    }

    /// Returns the configured distribution grid.
    pub fn grid(&self) -> &DistributionGrid {
        &self.grid
    }

    /// Number of participants (rows).
    pub fn participant_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of statements (columns).
    pub fn statement_count(&self) -> usize {
        self.grid.statement_count()
    }

    /// One participant's full rank vector.
    pub fn participant_ranks(&self, participant: ParticipantId) -> &[i32] {
        &self.rows[participant.index()]
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<i32>] {
        &self.rows
    }

    /// The rank participant `p` gave statement `s`.
    pub fn rank(&self, participant: usize, statement: usize) -> i32 {
        self.rows[participant][statement]
    }

    /// Builds a resampled matrix from participant indices (with
    /// replacement). Rows were validated at construction, so the resample
    /// skips revalidation.
    pub fn resample(&self, participant_indices: &[usize]) -> QSortMatrix {
        let rows = participant_indices
            .iter()
            .map(|&i| self.rows[i].clone())
            .collect();
        QSortMatrix {
            grid: self.grid.clone(),
            rows,
        }
    }
}
