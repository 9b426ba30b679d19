//! Distinguishing and consensus statements.
//!
//! Per-factor standard errors come from the Spearman-Brown composite
//! reliability of the factor's defining sorters; z-score differences
//! between factor pairs are tested against the standard error of
//! differences at the 0.05 and 0.01 levels.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, StatementId};
use crate::domain::rotation::RotatedSolution;

use super::factor_arrays::FactorArray;

/// Significance of a z-score difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignificanceLevel {
    /// |Δz| > 1.96 · SED
    P05,
    /// |Δz| > 2.58 · SED
    P01,
}

/// Thresholds applied to `|Δz| / SED`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignificanceThresholds {
    pub p05: f64,
    pub p01: f64,
}

impl Default for SignificanceThresholds {
    fn default() -> Self {
        Self {
            p05: 1.96,
            p01: 2.58,
        }
    }
}

/// One statement's z-score contrast between a pair of factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseComparison {
    pub statement: StatementId,
    pub factor_a: usize,
    pub factor_b: usize,
    pub z_delta: f64,
    pub significance: Option<SignificanceLevel>,
}

/// A statement whose placement separates one factor from every other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistinguishingStatement {
    pub statement: StatementId,
    pub factor: usize,
    /// Mean z-score difference against all other factors.
    pub mean_z_delta: f64,
    /// Weakest significance across the pairwise tests.
    pub significance: SignificanceLevel,
    /// Significant at the 0.01 level against every other factor.
    pub pure: bool,
}

/// A statement no factor pair disagrees on significantly, ranked by how
/// tightly the factors agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusStatement {
    pub statement: StatementId,
    /// Spread between the highest and lowest factor z-score.
    pub z_range: f64,
}

/// Distinguishing and consensus statements for a set of factor arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementComparison {
    distinguishing: Vec<DistinguishingStatement>,
    consensus: Vec<ConsensusStatement>,
    pairwise: Vec<PairwiseComparison>,
    standard_errors: Vec<f64>,
    defining_counts: Vec<usize>,
}

impl StatementComparison {
    pub fn distinguishing(&self) -> &[DistinguishingStatement] {
        &self.distinguishing
    }

    pub fn consensus(&self) -> &[ConsensusStatement] {
        &self.consensus
    }

    pub fn pairwise(&self) -> &[PairwiseComparison] {
        &self.pairwise
    }

    /// Standard error of each factor's array scores.
    pub fn standard_errors(&self) -> &[f64] {
        &self.standard_errors
    }

    /// Number of sorters whose strongest loading sits on each factor.
    pub fn defining_counts(&self) -> &[usize] {
        &self.defining_counts
    }

    pub fn distinguishing_for(&self, factor: usize) -> Vec<&DistinguishingStatement> {
        self.distinguishing
            .iter()
            .filter(|d| d.factor == factor)
            .collect()
    }
}

/// Runs the pairwise significance tests across all factor arrays.
///
/// # Errors
///
/// - `InsufficientData` with fewer than two factors, comparison needs a
///   pair
pub fn compare_statements(
    arrays: &[FactorArray],
    rotated: &RotatedSolution,
    thresholds: SignificanceThresholds,
) -> Result<StatementComparison, DomainError> {
    if arrays.len() < 2 {
        return Err(DomainError::new(
            ErrorCode::InsufficientData,
            "Distinguishing-statement analysis needs at least two factors",
        ));
    }

    let factor_count = arrays.len();
    let statement_count = arrays[0].statement_count();

    let defining_counts = count_defining_sorters(rotated);
    let standard_errors: Vec<f64> = defining_counts
        .iter()
        .map(|&p| standard_error(p))
        .collect();

    let mut pairwise = Vec::new();
    let mut distinguishing = Vec::new();
    let mut consensus = Vec::new();

    for s in 0..statement_count {
        let statement = StatementId::new(s);
        let mut any_significant = false;

        for a in 0..factor_count {
            for b in (a + 1)..factor_count {
                let delta = arrays[a].z_score(statement) - arrays[b].z_score(statement);
                let sed =
                    (standard_errors[a].powi(2) + standard_errors[b].powi(2)).sqrt();
                let significance = classify(delta, sed, thresholds);
                if significance.is_some() {
                    any_significant = true;
                }
                pairwise.push(PairwiseComparison {
                    statement,
                    factor_a: a,
                    factor_b: b,
                    z_delta: delta,
                    significance,
                });
            }
        }

        for f in 0..factor_count {
            if let Some(entry) =
                distinguishes(statement, f, arrays, &standard_errors, thresholds)
            {
                distinguishing.push(entry);
            }
        }

        if !any_significant {
            let z_values: Vec<f64> = arrays.iter().map(|a| a.z_score(statement)).collect();
            let hi = z_values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let lo = z_values.iter().cloned().fold(f64::INFINITY, f64::min);
            consensus.push(ConsensusStatement {
                statement,
                z_range: hi - lo,
            });
        }
    }

    consensus.sort_by(|a, b| {
        a.z_range
            .total_cmp(&b.z_range)
            .then(a.statement.index().cmp(&b.statement.index()))
    });

    Ok(StatementComparison {
        distinguishing,
        consensus,
        pairwise,
        standard_errors,
        defining_counts,
    })
}

/// Does `statement` separate factor `f` from every other factor at the
/// 0.05 level at least?
fn distinguishes(
    statement: StatementId,
    f: usize,
    arrays: &[FactorArray],
    standard_errors: &[f64],
    thresholds: SignificanceThresholds,
) -> Option<DistinguishingStatement> {
    let mut weakest = SignificanceLevel::P01;
    let mut delta_sum = 0.0;
    let mut others = 0usize;

    for (g, other) in arrays.iter().enumerate() {
        if g == f {
            continue;
        }
        let delta = arrays[f].z_score(statement) - other.z_score(statement);
        let sed = (standard_errors[f].powi(2) + standard_errors[g].powi(2)).sqrt();
        match classify(delta, sed, thresholds) {
            Some(SignificanceLevel::P01) => {}
            Some(SignificanceLevel::P05) => weakest = SignificanceLevel::P05,
            None => return None,
        }
        delta_sum += delta;
        others += 1;
    }

    Some(DistinguishingStatement {
        statement,
        factor: f,
        mean_z_delta: delta_sum / others as f64,
        significance: weakest,
        pure: weakest == SignificanceLevel::P01,
    })
}

fn classify(
    delta: f64,
    sed: f64,
    thresholds: SignificanceThresholds,
) -> Option<SignificanceLevel> {
    if sed <= 0.0 {
        return None;
    }
    let ratio = delta.abs() / sed;
    if ratio > thresholds.p01 {
        Some(SignificanceLevel::P01)
    } else if ratio > thresholds.p05 {
        Some(SignificanceLevel::P05)
    } else {
        None
    }
}

/// Each sorter defines the factor holding their largest absolute loading.
fn count_defining_sorters(rotated: &RotatedSolution) -> Vec<usize> {
    let mut counts = vec![0usize; rotated.factor_count()];
    for p in 0..rotated.participant_count() {
        let mut best = 0usize;
        let mut best_abs = f64::NEG_INFINITY;
        for f in 0..rotated.factor_count() {
            let l = rotated.loading(p, f).abs();
            if l > best_abs {
                best_abs = l;
                best = f;
            }
        }
        counts[best] += 1;
    }
    counts
}

/// Composite reliability `0.8p / (1 + (p - 1) · 0.8)` and the resulting
/// standard error `√(1 - rel)`. A factor nobody defines gets reliability
/// zero and a standard error of one.
fn standard_error(defining: usize) -> f64 {
    if defining == 0 {
        return 1.0;
    }
    let p = defining as f64;
    let reliability = 0.8 * p / (1.0 + (p - 1.0) * 0.8);
    (1.0 - reliability).sqrt()
}
