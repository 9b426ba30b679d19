//! Bootstrap reliability analysis.
//!
//! Resamples participants with replacement, re-runs extraction and
//! rotation on each resample, aligns the resampled factors back to the
//! reference solution, and summarizes loading stability as percentile
//! confidence intervals. Deterministic under a fixed seed and
//! cancellable between resamples.

use std::sync::atomic::{AtomicBool, Ordering};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::domain::extraction::{extract, ExtractionMethod, ExtractionOptions};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::qsort::{CorrelationMatrix, QSortMatrix};
use crate::domain::rotation::{rotate, unrotated, RotatedSolution, RotationMethod, RotationOptions};

/// Bootstrap run parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BootstrapOptions {
    /// Number of resamples to draw.
    pub resamples: usize,
    /// Fixed seed for reproducible runs; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Two-sided confidence level for the percentile intervals.
    pub confidence: f64,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            resamples: 1000,
            seed: None,
            confidence: 0.95,
        }
    }
}

/// Stability summary for one participant's loading on one factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadingEstimate {
    /// Resampled observations behind this estimate.
    pub observations: usize,
    pub mean: f64,
    pub std_error: f64,
    /// Percentile interval bounds at the requested confidence.
    pub lower: f64,
    pub upper: f64,
}

impl LoadingEstimate {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Outcome of a full bootstrap run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapResult {
    resamples_completed: usize,
    resamples_failed: usize,
    /// `estimates[f][p]`; `None` when a participant was never drawn.
    estimates: Vec<Vec<Option<LoadingEstimate>>>,
    /// Mean absolute alignment correlation per factor, in [0, 1].
    factor_stability: Vec<f64>,
    seed: u64,
}

impl BootstrapResult {
    pub fn resamples_completed(&self) -> usize {
        self.resamples_completed
    }

    /// Resamples dropped because extraction or rotation failed on them.
    pub fn resamples_failed(&self) -> usize {
        self.resamples_failed
    }

    pub fn estimate(&self, participant: usize, factor: usize) -> Option<&LoadingEstimate> {
        self.estimates[factor][participant].as_ref()
    }

    /// How faithfully each factor reappeared across resamples.
    pub fn factor_stability(&self) -> &[f64] {
        &self.factor_stability
    }

    /// The seed actually used; pass it back in to reproduce the run.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Runs the bootstrap against a reference solution.
///
/// The same extraction and rotation settings that produced the reference
/// are replayed on every resample. The `cancel` flag is checked between
/// resamples; setting it aborts with `BootstrapCancelled` without
/// returning partial estimates.
///
/// # Errors
///
/// - `ValidationFailed` if `resamples` is zero or `confidence` is not in
///   (0, 1)
/// - `BootstrapCancelled` when the flag is raised mid-run
#[allow(clippy::too_many_arguments)]
pub fn run_bootstrap(
    matrix: &QSortMatrix,
    reference: &RotatedSolution,
    extraction: ExtractionMethod,
    extraction_options: &ExtractionOptions,
    rotation: Option<RotationMethod>,
    rotation_options: &RotationOptions,
    options: &BootstrapOptions,
    cancel: &AtomicBool,
) -> Result<BootstrapResult, DomainError> {
    if options.resamples == 0 {
        return Err(DomainError::validation("resamples", "must be positive"));
    }
    if !(options.confidence > 0.0 && options.confidence < 1.0) {
        return Err(DomainError::validation(
            "confidence",
            "must lie strictly between 0 and 1",
        ));
    }

    let participant_count = matrix.participant_count();
    let factor_count = reference.factor_count();

    let seed = options.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    // samples[f][p] collects every aligned loading observed for that cell.
    let mut samples: Vec<Vec<Vec<f64>>> =
        vec![vec![Vec::new(); participant_count]; factor_count];
    let mut stability_sums = vec![0.0_f64; factor_count];
    let mut completed = 0usize;
    let mut failed = 0usize;

    for _ in 0..options.resamples {
        if cancel.load(Ordering::Relaxed) {
            return Err(DomainError::new(
                ErrorCode::BootstrapCancelled,
                "Bootstrap run cancelled",
            )
            .with_detail("completed", completed.to_string()));
        }

        let indices: Vec<usize> = (0..participant_count)
            .map(|_| rng.gen_range(0..participant_count))
            .collect();

        match resample_once(
            matrix,
            reference,
            extraction,
            extraction_options,
            rotation,
            rotation_options,
            &indices,
        ) {
            Ok(aligned) => {
                for f in 0..factor_count {
                    stability_sums[f] += aligned.alignment[f];
                    for (draw, &original) in indices.iter().enumerate() {
                        samples[f][original].push(aligned.loadings[f][draw]);
                    }
                }
                completed += 1;
            }
            Err(_) => failed += 1,
        }
    }

    if completed == 0 {
        return Err(DomainError::new(
            ErrorCode::InsufficientData,
            "Every bootstrap resample failed extraction or rotation",
        ));
    }

    let alpha = (1.0 - options.confidence) / 2.0;
    let estimates = samples
        .iter()
        .map(|per_factor| {
            per_factor
                .iter()
                .map(|cell| summarize(cell, alpha))
                .collect()
        })
        .collect();
    let factor_stability = stability_sums
        .iter()
        .map(|s| s / completed as f64)
        .collect();

    Ok(BootstrapResult {
        resamples_completed: completed,
        resamples_failed: failed,
        estimates,
        factor_stability,
        seed,
    })
}

struct AlignedResample {
    /// `loadings[f][draw]`, aligned to the reference factor order/sign.
    loadings: Vec<Vec<f64>>,
    /// |correlation| achieved against each reference factor.
    alignment: Vec<f64>,
}

fn resample_once(
    matrix: &QSortMatrix,
    reference: &RotatedSolution,
    extraction: ExtractionMethod,
    extraction_options: &ExtractionOptions,
    rotation: Option<RotationMethod>,
    rotation_options: &RotationOptions,
    indices: &[usize],
) -> Result<AlignedResample, DomainError> {
    let resampled = matrix.resample(indices);
    let correlation = CorrelationMatrix::from_qsorts(&resampled)?;
    let solution = extract(&correlation, extraction, extraction_options)?;
    let rotated = match rotation {
        Some(method) => rotate(&solution, method, rotation_options)?,
        None => unrotated(&solution),
    };
    Ok(align(reference, &rotated, indices))
}

/// Matches each reference factor with the resampled factor it correlates
/// most strongly with, flipping signs so the correlation is positive.
/// Factor order from extraction is arbitrary under resampling, so a
/// greedy best-match per reference factor keeps cells comparable.
fn align(
    reference: &RotatedSolution,
    resampled: &RotatedSolution,
    indices: &[usize],
) -> AlignedResample {
    let factor_count = reference.factor_count();
    let draws = indices.len();

    let mut loadings = Vec::with_capacity(factor_count);
    let mut alignment = Vec::with_capacity(factor_count);
    let mut taken = vec![false; resampled.factor_count()];

    for f in 0..factor_count {
        let target: Vec<f64> = indices.iter().map(|&p| reference.loading(p, f)).collect();

        let mut best: Option<(usize, f64)> = None;
        for g in 0..resampled.factor_count() {
            if taken[g] {
                continue;
            }
            let candidate: Vec<f64> =
                (0..draws).map(|d| resampled.loading(d, g)).collect();
            let r = pearson(&target, &candidate);
            let better = match best {
                Some((_, current)) => r.abs() > current.abs(),
                None => true,
            };
            if better {
                best = Some((g, r));
            }
        }

        match best {
            Some((g, r)) => {
                taken[g] = true;
                let sign = if r < 0.0 { -1.0 } else { 1.0 };
                loadings.push(
                    (0..draws)
                        .map(|d| sign * resampled.loading(d, g))
                        .collect(),
                );
                alignment.push(r.abs());
            }
            None => {
                // Resample produced fewer factors than the reference.
                loadings.push(vec![0.0; draws]);
                alignment.push(0.0);
            }
        }
    }

    AlignedResample {
        loadings,
        alignment,
    }
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

fn summarize(samples: &[f64], alpha: f64) -> Option<LoadingEstimate> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    Some(LoadingEstimate {
        observations: samples.len(),
        mean,
        std_error: variance.sqrt(),
        lower: percentile(&sorted, alpha),
        upper: percentile(&sorted, 1.0 - alpha),
    })
}

/// Linear-interpolation percentile of a sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let position = q * (sorted.len() - 1) as f64;
    let low = position.floor() as usize;
    let high = position.ceil() as usize;
    let weight = position - low as f64;
    sorted[low] * (1.0 - weight) + sorted[high] * weight
}
