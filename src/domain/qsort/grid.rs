//! Forced-distribution grid configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::foundation::ValidationError;

/// One rank column of the forced distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridColumn {
    /// Rank value assigned to statements placed in this column (e.g., -4).
    pub value: i32,
    /// Number of statements the column holds.
    pub capacity: usize,
}

impl GridColumn {
    pub fn new(value: i32, capacity: usize) -> Self {
        Self { value, capacity }
    }
}

/// The study's forced-distribution shape.
///
/// A quasi-normal grid such as `-4..=+4` with capacities
/// `[2, 3, 4, 5, 6, 5, 4, 3, 2]`. Every participant's Q sort must place
/// exactly `capacity` statements in each column.
///
/// # Invariants
///
/// - At least two columns
/// - Column values strictly increasing
/// - Every capacity >= 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionGrid {
    columns: Vec<GridColumn>,
}

impl DistributionGrid {
    /// Creates a grid from ordered columns.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` if fewer than two columns, values are not strictly
    ///   increasing, or any capacity is zero
    pub fn new(columns: Vec<GridColumn>) -> Result<Self, ValidationError> {
        if columns.len() < 2 {
            return Err(ValidationError::invalid_format(
                "columns",
                "A distribution grid needs at least two rank columns",
            ));
        }
        for pair in columns.windows(2) {
            if pair[1].value <= pair[0].value {
                return Err(ValidationError::invalid_format(
                    "columns",
                    format!(
                        "Column values must be strictly increasing, got {} after {}",
                        pair[1].value, pair[0].value
                    ),
                ));
            }
        }
        if let Some(col) = columns.iter().find(|c| c.capacity == 0) {
            return Err(ValidationError::invalid_format(
                "columns",
                format!("Column {} has zero capacity", col.value),
            ));
        }
        Ok(Self { columns })
    }

    /// Builds a symmetric grid from `-extent..=+extent` with the given
    /// capacities (ordered from the most-negative column).
    pub fn symmetric(extent: u32, capacities: &[usize]) -> Result<Self, ValidationError> {
        let extent = extent as i32;
        let expected = (2 * extent + 1) as usize;
        if capacities.len() != expected {
            return Err(ValidationError::out_of_range(
                "capacities",
                expected as i32,
                expected as i32,
                capacities.len() as i32,
            ));
        }
        let columns = capacities
            .iter()
            .enumerate()
            .map(|(i, &capacity)| GridColumn::new(i as i32 - extent, capacity))
            .collect();
        Self::new(columns)
    }

    /// Returns the grid columns ordered from lowest to highest rank.
    pub fn columns(&self) -> &[GridColumn] {
        &self.columns
    }

    /// Total number of statements the grid holds.
    pub fn statement_count(&self) -> usize {
        self.columns.iter().map(|c| c.capacity).sum()
    }

    /// Expected count of statements per rank value.
    pub fn expected_counts(&self) -> HashMap<i32, usize> {
        self.columns.iter().map(|c| (c.value, c.capacity)).collect()
    }

    /// Rank values expanded by capacity, highest rank first.
    ///
    /// Used to map z-score-ordered statements onto the grid: the statement
    /// with the highest z-score takes the first entry, and so on.
    pub fn ranks_descending(&self) -> Vec<i32> {
        let mut ranks = Vec::with_capacity(self.statement_count());
        for col in self.columns.iter().rev() {
            ranks.extend(std::iter::repeat(col.value).take(col.capacity));
        }
        ranks
    }

    /// Whether the given per-rank counts match this grid exactly.
    pub fn matches_counts(&self, counts: &HashMap<i32, usize>) -> bool {
        &self.expected_counts() == counts
    }
}
