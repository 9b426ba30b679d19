//! Crib sheets: a per-factor interpretation worksheet.
//!
//! Four sections per factor, following the Watts and Stenner layout:
//! statements at the grid extremes, and statements ranked strictly
//! higher or lower here than in any other factor array.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StatementId;

use super::factor_arrays::FactorArray;

/// One statement line on a crib sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CribEntry {
    pub statement: StatementId,
    pub rank: i32,
    pub z_score: f64,
}

/// Interpretation worksheet for a single factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CribSheet {
    factor: usize,
    highest_ranked: Vec<CribEntry>,
    lowest_ranked: Vec<CribEntry>,
    ranked_higher_than_elsewhere: Vec<CribEntry>,
    ranked_lower_than_elsewhere: Vec<CribEntry>,
}

impl CribSheet {
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Statements placed in the grid's top column.
    pub fn highest_ranked(&self) -> &[CribEntry] {
        &self.highest_ranked
    }

    /// Statements placed in the grid's bottom column.
    pub fn lowest_ranked(&self) -> &[CribEntry] {
        &self.lowest_ranked
    }

    /// Statements this factor ranks strictly above every other factor.
    pub fn ranked_higher_than_elsewhere(&self) -> &[CribEntry] {
        &self.ranked_higher_than_elsewhere
    }

    /// Statements this factor ranks strictly below every other factor.
    pub fn ranked_lower_than_elsewhere(&self) -> &[CribEntry] {
        &self.ranked_lower_than_elsewhere
    }
}

/// Builds one crib sheet per factor array. Entries within each section
/// are ordered by descending z-score.
pub fn build_crib_sheets(arrays: &[FactorArray]) -> Vec<CribSheet> {
    arrays
        .iter()
        .map(|array| build_one(array, arrays))
        .collect()
}

fn build_one(array: &FactorArray, all: &[FactorArray]) -> CribSheet {
    let statement_count = array.statement_count();
    let top = array.ranks().iter().copied().max().unwrap_or(0);
    let bottom = array.ranks().iter().copied().min().unwrap_or(0);

    let mut highest_ranked = Vec::new();
    let mut lowest_ranked = Vec::new();
    let mut ranked_higher = Vec::new();
    let mut ranked_lower = Vec::new();

    for s in 0..statement_count {
        let statement = StatementId::new(s);
        let rank = array.rank(statement);
        let entry = CribEntry {
            statement,
            rank,
            z_score: array.z_score(statement),
        };

        if rank == top {
            highest_ranked.push(entry.clone());
        }
        if rank == bottom {
            lowest_ranked.push(entry.clone());
        }

        let others = all.iter().filter(|other| other.factor() != array.factor());
        let mut above_all = true;
        let mut below_all = true;
        let mut any_other = false;
        for other in others {
            any_other = true;
            let other_rank = other.rank(statement);
            if rank <= other_rank {
                above_all = false;
            }
            if rank >= other_rank {
                below_all = false;
            }
        }
        if any_other && above_all {
            ranked_higher.push(entry.clone());
        }
        if any_other && below_all {
            ranked_lower.push(entry);
        }
    }

    let by_z_desc = |a: &CribEntry, b: &CribEntry| {
        b.z_score
            .total_cmp(&a.z_score)
            .then(a.statement.index().cmp(&b.statement.index()))
    };
    highest_ranked.sort_by(by_z_desc);
    lowest_ranked.sort_by(by_z_desc);
    ranked_higher.sort_by(by_z_desc);
    ranked_lower.sort_by(by_z_desc);

    CribSheet {
        factor: array.factor(),
        highest_ranked,
        lowest_ranked,
        ranked_higher_than_elsewhere: ranked_higher,
        ranked_lower_than_elsewhere: ranked_lower,
    }
}
