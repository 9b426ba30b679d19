//! Rotation engine: orthogonal (varimax, quartimax) and oblique (promax,
//! direct oblimin) rotation, plus manual rotation-matrix application.

mod oblimin;
mod orthomax;
mod promax;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::extraction::FactorSolution;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Rotation strategy. A flat variant set; each kernel lives in its own
/// module and stays independently testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMethod {
    /// Orthogonal, column-simplicity (Kaiser's varimax).
    Varimax,
    /// Orthogonal, row-simplicity variant.
    Quartimax,
    /// Oblique: varimax start, power-target least squares.
    Promax,
    /// Oblique: gradient-projection oblimin family.
    DirectOblimin,
}

impl RotationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            RotationMethod::Varimax => "varimax",
            RotationMethod::Quartimax => "quartimax",
            RotationMethod::Promax => "promax",
            RotationMethod::DirectOblimin => "direct_oblimin",
        }
    }

    /// Whether factors may correlate after this rotation.
    pub fn is_oblique(&self) -> bool {
        matches!(self, RotationMethod::Promax | RotationMethod::DirectOblimin)
    }
}

/// Tunable rotation parameters; defaults come from `AnalysisConfig`.
#[derive(Debug, Clone, Copy)]
pub struct RotationOptions {
    /// Convergence tolerance for the iterative kernels.
    pub tolerance: f64,
    /// Sweep/iteration cap.
    pub max_iterations: usize,
    /// Promax power κ.
    pub promax_kappa: f64,
    /// Oblimin γ (0 = quartimin).
    pub oblimin_gamma: f64,
}

/// Session rotation mode, fixed when a session opens. Manual matrices are
/// validated against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    Orthogonal,
    Oblique,
}

/// A caller-supplied pairwise plane rotation, the unit of interactive
/// hand rotation. The preview primitive applies exactly this matrix, so a
/// client-side duplicate of the numerics matches the server bit for bit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationDelta {
    /// First factor of the rotation plane (zero-based).
    pub factor_a: usize,
    /// Second factor of the rotation plane (zero-based).
    pub factor_b: usize,
    /// Counter-clockwise angle in degrees.
    pub angle_degrees: f64,
}

impl RotationDelta {
    /// Expands the delta into a k×k Givens rotation matrix.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the factor indices are out of range or equal
    pub fn to_matrix(&self, factor_count: usize) -> Result<DMatrix<f64>, DomainError> {
        if self.factor_a >= factor_count
            || self.factor_b >= factor_count
            || self.factor_a == self.factor_b
        {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!(
                    "Rotation plane ({}, {}) is invalid for {} factors",
                    self.factor_a, self.factor_b, factor_count
                ),
            ));
        }
        let theta = self.angle_degrees.to_radians();
        let mut matrix = DMatrix::identity(factor_count, factor_count);
        matrix[(self.factor_a, self.factor_a)] = theta.cos();
        matrix[(self.factor_b, self.factor_b)] = theta.cos();
        matrix[(self.factor_a, self.factor_b)] = -theta.sin();
        matrix[(self.factor_b, self.factor_a)] = theta.sin();
        Ok(matrix)
    }
}

/// Result of a rotation, derived from an immutable [`FactorSolution`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotatedSolution {
    method: Option<RotationMethod>,
    participant_count: usize,
    /// `factors[f][p]` is participant p's rotated loading on factor f.
    factors: Vec<Vec<f64>>,
    /// k×k rotation matrix, row-major.
    rotation_matrix: Vec<Vec<f64>>,
    /// Factor correlation matrix, oblique rotations only.
    factor_correlations: Option<Vec<Vec<f64>>>,
    converged: bool,
    iterations: usize,
}

impl RotatedSolution {
    pub(crate) fn from_parts(
        method: Option<RotationMethod>,
        loadings: &DMatrix<f64>,
        rotation: &DMatrix<f64>,
        factor_correlations: Option<&DMatrix<f64>>,
        converged: bool,
        iterations: usize,
    ) -> Self {
        let mut solution = Self {
            method,
            participant_count: loadings.nrows(),
            factors: matrix_columns(loadings),
            rotation_matrix: matrix_rows(rotation),
            factor_correlations: factor_correlations.map(matrix_rows),
            converged,
            iterations,
        };
        solution.normalize_signs();
        solution
    }

    /// Flips each factor so its largest-magnitude loading is positive;
    /// the rotation matrix and factor correlations flip with it so the
    /// parts stay mutually consistent.
    fn normalize_signs(&mut self) {
        let k = self.factors.len();
        for f in 0..k {
            let dominant = self.factors[f]
                .iter()
                .cloned()
                .max_by(|a, b| a.abs().total_cmp(&b.abs()));
            let flip = matches!(dominant, Some(value) if value < 0.0);
            if !flip {
                continue;
            }
            for loading in &mut self.factors[f] {
                *loading = -*loading;
            }
            for row in &mut self.rotation_matrix {
                row[f] = -row[f];
            }
            if let Some(phi) = &mut self.factor_correlations {
                for (i, row) in phi.iter_mut().enumerate() {
                    for (j, value) in row.iter_mut().enumerate() {
                        if (i == f) != (j == f) {
                            *value = -*value;
                        }
                    }
                }
            }
        }
    }

    /// `None` for manual rotations.
    pub fn method(&self) -> Option<RotationMethod> {
        self.method
    }

    pub fn factor_count(&self) -> usize {
        self.factors.len()
    }

    pub fn participant_count(&self) -> usize {
        self.participant_count
    }

    /// Rotated loading of participant `p` on factor `f`.
    pub fn loading(&self, participant: usize, factor: usize) -> f64 {
        self.factors[factor][participant]
    }

    /// One factor's rotated loadings across participants.
    pub fn factor_loadings(&self, factor: usize) -> &[f64] {
        &self.factors[factor]
    }

    pub fn rotation_matrix(&self) -> &[Vec<f64>] {
        &self.rotation_matrix
    }

    /// Factor correlation matrix; populated for oblique rotations only.
    pub fn factor_correlations(&self) -> Option<&[Vec<f64>]> {
        self.factor_correlations.as_deref()
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Loadings as a participants × factors matrix.
    pub fn loadings_matrix(&self) -> DMatrix<f64> {
        columns_to_matrix(self.participant_count, &self.factors)
    }

    /// Rotation matrix as a k×k `DMatrix`.
    pub fn rotation_dmatrix(&self) -> DMatrix<f64> {
        let k = self.factor_count();
        DMatrix::from_fn(k, k, |i, j| self.rotation_matrix[i][j])
    }
}

/// Rotates an extracted solution with the requested method.
///
/// k = 1 skips rotation entirely and returns the loadings under an
/// identity rotation. The convergence flag is always populated; callers
/// decide whether non-convergence is a warning or a hard failure.
pub fn rotate(
    solution: &FactorSolution,
    method: RotationMethod,
    options: &RotationOptions,
) -> Result<RotatedSolution, DomainError> {
    let loadings = loadings_of(solution);
    let k = solution.factor_count();
    if k <= 1 {
        let identity = DMatrix::identity(k, k);
        return Ok(RotatedSolution::from_parts(
            Some(method),
            &loadings,
            &identity,
            None,
            true,
            0,
        ));
    }

    match method {
        RotationMethod::Varimax => {
            let out = orthomax::rotate(&loadings, 1.0, options)?;
            Ok(RotatedSolution::from_parts(
                Some(method),
                &out.loadings,
                &out.rotation,
                None,
                out.converged,
                out.iterations,
            ))
        }
        RotationMethod::Quartimax => {
            let out = orthomax::rotate(&loadings, 0.0, options)?;
            Ok(RotatedSolution::from_parts(
                Some(method),
                &out.loadings,
                &out.rotation,
                None,
                out.converged,
                out.iterations,
            ))
        }
        RotationMethod::Promax => {
            let out = promax::rotate(&loadings, options)?;
            Ok(RotatedSolution::from_parts(
                Some(method),
                &out.loadings,
                &out.rotation,
                Some(&out.factor_correlations),
                out.converged,
                out.iterations,
            ))
        }
        RotationMethod::DirectOblimin => {
            let out = oblimin::rotate(&loadings, options)?;
            Ok(RotatedSolution::from_parts(
                Some(method),
                &out.loadings,
                &out.rotation,
                Some(&out.factor_correlations),
                out.converged,
                out.iterations,
            ))
        }
    }
}

/// Applies an operator-supplied rotation matrix to existing loadings.
///
/// The pure primitive behind interactive previews and confirmations.
///
/// # Errors
///
/// - `InvalidDimensions` if the matrix is not k×k
/// - `NonOrthogonalMatrix` in orthogonal mode when `TᵀT` deviates from
///   the identity beyond `tolerance`
/// - `RotationSingular` in oblique mode when the matrix is not invertible
pub fn apply_manual(
    solution: &RotatedSolution,
    rotation: &DMatrix<f64>,
    mode: RotationMode,
    tolerance: f64,
) -> Result<RotatedSolution, DomainError> {
    let k = solution.factor_count();
    if rotation.nrows() != k || rotation.ncols() != k {
        return Err(DomainError::new(
            ErrorCode::InvalidDimensions,
            format!(
                "Rotation matrix is {}x{}, expected {}x{}",
                rotation.nrows(),
                rotation.ncols(),
                k,
                k
            ),
        ));
    }

    let factor_correlations = match mode {
        RotationMode::Orthogonal => {
            let gram = rotation.transpose() * rotation;
            let deviation = (&gram - DMatrix::identity(k, k)).abs().max();
            if deviation > tolerance {
                return Err(DomainError::new(
                    ErrorCode::NonOrthogonalMatrix,
                    "Manual rotation matrix is not orthogonal within tolerance",
                )
                .with_detail("deviation", format!("{deviation:e}"))
                .with_detail("tolerance", format!("{tolerance:e}")));
            }
            None
        }
        RotationMode::Oblique => {
            let gram = rotation.transpose() * rotation;
            let inverse = gram.try_inverse().ok_or_else(|| {
                DomainError::new(
                    ErrorCode::RotationSingular,
                    "Manual rotation matrix is singular",
                )
            })?;
            Some(inverse)
        }
    };

    let rotated = solution.loadings_matrix() * rotation;
    let combined = solution.rotation_dmatrix() * rotation;
    Ok(RotatedSolution::from_parts(
        None,
        &rotated,
        &combined,
        factor_correlations.as_ref(),
        true,
        0,
    ))
}

/// Wraps unrotated loadings so the statistical generator can run before
/// any rotation is confirmed, and previews have a base to start from.
pub fn unrotated(solution: &FactorSolution) -> RotatedSolution {
    let loadings = loadings_of(solution);
    let identity = DMatrix::identity(solution.factor_count(), solution.factor_count());
    RotatedSolution::from_parts(None, &loadings, &identity, None, true, 0)
}

fn loadings_of(solution: &FactorSolution) -> DMatrix<f64> {
    let n = solution.participant_count();
    let k = solution.factor_count();
    DMatrix::from_fn(n, k, |p, f| solution.loading(p, f))
}

fn matrix_columns(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    (0..matrix.ncols())
        .map(|c| matrix.column(c).iter().cloned().collect())
        .collect()
}

fn matrix_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    (0..matrix.nrows())
        .map(|r| matrix.row(r).iter().cloned().collect())
        .collect()
}

fn columns_to_matrix(rows: usize, columns: &[Vec<f64>]) -> DMatrix<f64> {
    DMatrix::from_fn(rows, columns.len(), |p, f| columns[f][p])
}
