//! The analysis session aggregate.
//!
//! Owns the Q-sort matrix, the immutable factor solution, and the
//! confirmed rotation with its derived outputs. `apply_rotation` is the
//! only mutator of analysis state; previews are pure reads. Optimistic
//! versioning serializes concurrent confirmations: a stale expected
//! version fails without touching the session.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::extraction::{extract, ExtractionMethod, ExtractionOptions, FactorSolution};
use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, SessionId, SessionPhase, StateMachine, Timestamp,
};
use crate::domain::qsort::{CorrelationMatrix, QSortMatrix};
use crate::domain::rotation::{
    apply_manual, rotate, unrotated, RotatedSolution, RotationDelta, RotationMethod, RotationMode,
    RotationOptions,
};
use crate::domain::scoring::{generate_outputs, SignificanceThresholds, StatisticalOutputs};

use super::events::{
    CloseReason, RotationConfirmed, RotationPreviewed, SessionClosed, SessionOpened,
};

/// Analysis parameters fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub extraction_method: ExtractionMethod,
    pub extraction_options: ExtractionOptions,
    pub rotation_options: RotationOptions,
    pub rotation_mode: RotationMode,
    /// Orthogonality tolerance for manual rotation matrices.
    pub manual_tolerance: f64,
    pub thresholds: SignificanceThresholds,
}

/// How a confirmation reshapes the loadings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RotationParams {
    /// Run an automatic rotation from the extracted solution.
    Method { method: RotationMethod },
    /// Apply one pairwise plane rotation to the confirmed loadings.
    Delta { delta: RotationDelta },
    /// Apply a full operator-supplied rotation matrix, row-major.
    Matrix { rows: Vec<Vec<f64>> },
}

/// Successful confirmation: the new version with its recomputed outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedRotation {
    pub version: u64,
    pub rotated: RotatedSolution,
    pub outputs: StatisticalOutputs,
}

/// Exportable state captured when a confirmed session closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub version: u64,
    pub rotated: RotatedSolution,
    pub outputs: StatisticalOutputs,
    pub closed_at: Timestamp,
}

/// Aggregate root for one interactive analysis.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    id: SessionId,
    phase: SessionPhase,
    version: u64,
    matrix: QSortMatrix,
    settings: SessionSettings,
    solution: FactorSolution,
    confirmed: RotatedSolution,
    outputs: Option<StatisticalOutputs>,
    last_activity: Timestamp,
}

impl AnalysisSession {
    /// Opens a session: runs extraction immediately and lands in
    /// `Extracted` with version 0 and unrotated loadings as the base.
    pub fn open(
        matrix: QSortMatrix,
        settings: SessionSettings,
    ) -> Result<(Self, SessionOpened), DomainError> {
        let correlation = CorrelationMatrix::from_qsorts(&matrix)?;
        let solution = extract(
            &correlation,
            settings.extraction_method,
            &settings.extraction_options,
        )?;
        let confirmed = unrotated(&solution);

        let phase = transition(SessionPhase::Created, SessionPhase::Extracted)?;
        let id = SessionId::new();
        let now = Timestamp::now();

        let event = SessionOpened {
            session_id: id,
            extraction_method: settings.extraction_method,
            factor_count: solution.factor_count(),
            participant_count: matrix.participant_count(),
            statement_count: matrix.statement_count(),
            occurred_at: now,
            event_id: EventId::new(),
        };

        let session = Self {
            id,
            phase,
            version: 0,
            matrix,
            settings,
            solution,
            confirmed,
            outputs: None,
            last_activity: now,
        };
        Ok((session, event))
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Monotonic confirmation counter; 0 until the first `apply_rotation`.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn matrix(&self) -> &QSortMatrix {
        &self.matrix
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn solution(&self) -> &FactorSolution {
        &self.solution
    }

    /// The authoritative loadings: unrotated until the first confirmation.
    pub fn confirmed(&self) -> &RotatedSolution {
        &self.confirmed
    }

    /// Derived outputs of the latest confirmation, if any.
    pub fn outputs(&self) -> Option<&StatisticalOutputs> {
        self.outputs.as_ref()
    }

    pub fn last_activity(&self) -> Timestamp {
        self.last_activity
    }

    /// Records caller activity for idle accounting.
    pub fn touch(&mut self) {
        self.last_activity = Timestamp::now();
    }

    /// Whether the idle sweeper should reap this session.
    pub fn is_idle(&self, now: &Timestamp, idle_secs: u64) -> bool {
        self.phase.is_open() && self.last_activity.is_idle_since(now, idle_secs)
    }

    /// Computes an ephemeral preview of one plane rotation applied to the
    /// confirmed loadings. Pure: session state is untouched, and the
    /// numerics are exactly those of `apply_rotation` with the same delta.
    pub fn preview(
        &self,
        delta: &RotationDelta,
    ) -> Result<(RotatedSolution, RotationPreviewed), DomainError> {
        self.ensure_open()?;
        let rotation = delta.to_matrix(self.confirmed.factor_count())?;
        let previewed = apply_manual(
            &self.confirmed,
            &rotation,
            self.settings.rotation_mode,
            self.settings.manual_tolerance,
        )?;
        let event = RotationPreviewed {
            session_id: self.id,
            base_version: self.version,
            factor_a: delta.factor_a,
            factor_b: delta.factor_b,
            angle_degrees: delta.angle_degrees,
            occurred_at: Timestamp::now(),
            event_id: EventId::new(),
        };
        Ok((previewed, event))
    }

    /// Confirms a rotation: recomputes loadings and all derived outputs,
    /// increments the version, and moves to `RotationConfirmed`.
    ///
    /// # Errors
    ///
    /// - `SessionClosed` on a closed session
    /// - `StaleSessionVersion` when `expected_version` is behind; the
    ///   session is left untouched so the caller can refresh and retry
    pub fn apply_rotation(
        &mut self,
        params: &RotationParams,
        expected_version: u64,
    ) -> Result<(ConfirmedRotation, RotationConfirmed), DomainError> {
        self.ensure_open()?;
        if expected_version != self.version {
            return Err(DomainError::new(
                ErrorCode::StaleSessionVersion,
                format!(
                    "Session {} is at version {}, request expected {}",
                    self.id, self.version, expected_version
                ),
            )
            .with_detail("current_version", self.version.to_string())
            .with_detail("expected_version", expected_version.to_string()));
        }

        // Everything fallible happens before any field is written.
        let rotated = self.compute_rotation(params)?;
        let outputs = generate_outputs(&self.matrix, &rotated, self.settings.thresholds)?;
        let phase = transition(self.phase, SessionPhase::RotationConfirmed)?;

        self.phase = phase;
        self.version += 1;
        self.confirmed = rotated.clone();
        self.outputs = Some(outputs.clone());
        self.touch();

        let event = RotationConfirmed {
            session_id: self.id,
            version: self.version,
            method: rotated.method(),
            converged: rotated.converged(),
            occurred_at: self.last_activity,
            event_id: EventId::new(),
        };
        Ok((
            ConfirmedRotation {
                version: self.version,
                rotated,
                outputs,
            },
            event,
        ))
    }

    /// Closes the session. Returns an exportable snapshot when a
    /// confirmed rotation exists, `None` otherwise.
    ///
    /// # Errors
    ///
    /// - `SessionClosed` if the session is already closed
    pub fn close(
        &mut self,
        reason: CloseReason,
    ) -> Result<(Option<SessionSnapshot>, SessionClosed), DomainError> {
        self.ensure_open()?;
        let now = Timestamp::now();

        let snapshot = if self.phase.is_exportable() {
            self.outputs.as_ref().map(|outputs| SessionSnapshot {
                session_id: self.id,
                version: self.version,
                rotated: self.confirmed.clone(),
                outputs: outputs.clone(),
                closed_at: now,
            })
        } else {
            None
        };

        self.phase = transition(self.phase, SessionPhase::Closed)?;
        self.last_activity = now;

        let event = SessionClosed {
            session_id: self.id,
            final_version: self.version,
            reason,
            occurred_at: now,
            event_id: EventId::new(),
        };
        Ok((snapshot, event))
    }

    fn compute_rotation(&self, params: &RotationParams) -> Result<RotatedSolution, DomainError> {
        match params {
            RotationParams::Method { method } => {
                if method.is_oblique() && self.settings.rotation_mode == RotationMode::Orthogonal {
                    return Err(DomainError::new(
                        ErrorCode::ValidationFailed,
                        format!(
                            "{} is oblique but the session was opened in orthogonal mode",
                            method.name()
                        ),
                    ));
                }
                rotate(&self.solution, *method, &self.settings.rotation_options)
            }
            RotationParams::Delta { delta } => {
                let rotation = delta.to_matrix(self.confirmed.factor_count())?;
                apply_manual(
                    &self.confirmed,
                    &rotation,
                    self.settings.rotation_mode,
                    self.settings.manual_tolerance,
                )
            }
            RotationParams::Matrix { rows } => {
                let k = self.confirmed.factor_count();
                if rows.len() != k || rows.iter().any(|r| r.len() != k) {
                    return Err(DomainError::new(
                        ErrorCode::InvalidDimensions,
                        format!("Manual rotation matrix must be {}x{}", k, k),
                    ));
                }
                let rotation = DMatrix::from_fn(k, k, |i, j| rows[i][j]);
                apply_manual(
                    &self.confirmed,
                    &rotation,
                    self.settings.rotation_mode,
                    self.settings.manual_tolerance,
                )
            }
        }
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.phase.is_open() {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::SessionClosed,
                format!("Session {} is closed", self.id),
            ))
        }
    }
}

fn transition(from: SessionPhase, to: SessionPhase) -> Result<SessionPhase, DomainError> {
    from.transition_to(to)
        .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::qsort::{DistributionGrid, GridColumn};

    fn matrix() -> QSortMatrix {
        let grid = DistributionGrid::new(vec![
            GridColumn::new(-2, 1),
            GridColumn::new(-1, 2),
            GridColumn::new(0, 3),
            GridColumn::new(1, 2),
            GridColumn::new(2, 1),
        ])
        .unwrap();
        QSortMatrix::new(
            grid,
            vec![
                vec![-2, -1, -1, 0, 0, 0, 1, 1, 2],
                vec![-2, -1, -1, 0, 0, 1, 0, 1, 2],
                vec![-1, -2, -1, 0, 0, 0, 1, 2, 1],
                vec![2, 1, 1, 0, 0, 0, -1, -1, -2],
                vec![1, 2, 1, 0, 0, -1, 0, -2, -1],
                vec![2, 1, 0, 1, 0, -1, 0, -1, -2],
            ],
        )
        .unwrap()
    }

    fn settings() -> SessionSettings {
        SessionSettings {
            extraction_method: ExtractionMethod::PrincipalComponents,
            extraction_options: ExtractionOptions {
                factor_count: 2,
                centroid_max_iterations: 100,
                residual_variance_floor: 1e-9,
            },
            rotation_options: RotationOptions {
                tolerance: 1e-5,
                max_iterations: 50,
                promax_kappa: 4.0,
                oblimin_gamma: 0.0,
            },
            rotation_mode: RotationMode::Orthogonal,
            manual_tolerance: 1e-6,
            thresholds: SignificanceThresholds::default(),
        }
    }

    fn open() -> AnalysisSession {
        AnalysisSession::open(matrix(), settings()).unwrap().0
    }

    #[test]
    fn open_extracts_and_starts_at_version_zero() {
        let (session, event) = AnalysisSession::open(matrix(), settings()).unwrap();
        assert_eq!(session.phase(), SessionPhase::Extracted);
        assert_eq!(session.version(), 0);
        assert_eq!(session.solution().factor_count(), 2);
        assert!(session.outputs().is_none());
        assert_eq!(event.factor_count, 2);
        assert_eq!(event.participant_count, 6);
    }

    #[test]
    fn preview_leaves_state_untouched() {
        let session = open();
        let before = session.confirmed().clone();
        let delta = RotationDelta {
            factor_a: 0,
            factor_b: 1,
            angle_degrees: 30.0,
        };
        let (previewed, event) = session.preview(&delta).unwrap();
        assert_eq!(session.version(), 0);
        assert_eq!(session.phase(), SessionPhase::Extracted);
        assert_eq!(session.confirmed(), &before);
        assert_eq!(event.base_version, 0);
        assert_ne!(&previewed, &before);
    }

    #[test]
    fn apply_increments_version_and_derives_outputs() {
        let mut session = open();
        let (confirmed, event) = session
            .apply_rotation(
                &RotationParams::Method {
                    method: RotationMethod::Varimax,
                },
                0,
            )
            .unwrap();
        assert_eq!(confirmed.version, 1);
        assert_eq!(session.version(), 1);
        assert_eq!(session.phase(), SessionPhase::RotationConfirmed);
        assert!(session.outputs().is_some());
        assert_eq!(event.version, 1);
        assert_eq!(event.method, Some(RotationMethod::Varimax));
    }

    #[test]
    fn stale_version_never_mutates() {
        let mut session = open();
        session
            .apply_rotation(
                &RotationParams::Method {
                    method: RotationMethod::Varimax,
                },
                0,
            )
            .unwrap();
        let before = session.confirmed().clone();

        let err = session
            .apply_rotation(
                &RotationParams::Delta {
                    delta: RotationDelta {
                        factor_a: 0,
                        factor_b: 1,
                        angle_degrees: 15.0,
                    },
                },
                0,
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StaleSessionVersion);
        assert_eq!(err.details.get("current_version").map(String::as_str), Some("1"));
        assert_eq!(session.version(), 1);
        assert_eq!(session.confirmed(), &before);
    }

    #[test]
    fn preview_and_apply_share_numerics() {
        let mut session = open();
        let delta = RotationDelta {
            factor_a: 0,
            factor_b: 1,
            angle_degrees: 25.0,
        };
        let (previewed, _) = session.preview(&delta).unwrap();
        let (confirmed, _) = session
            .apply_rotation(&RotationParams::Delta { delta }, 0)
            .unwrap();
        assert_eq!(previewed, confirmed.rotated);
    }

    #[test]
    fn zero_then_ninety_degree_applies_return_to_plane_swap() {
        let mut session = open();
        let base = session.confirmed().clone();

        session
            .apply_rotation(
                &RotationParams::Delta {
                    delta: RotationDelta {
                        factor_a: 0,
                        factor_b: 1,
                        angle_degrees: 0.0,
                    },
                },
                0,
            )
            .unwrap();
        session
            .apply_rotation(
                &RotationParams::Delta {
                    delta: RotationDelta {
                        factor_a: 0,
                        factor_b: 1,
                        angle_degrees: 90.0,
                    },
                },
                1,
            )
            .unwrap();

        // A quarter turn swaps the two axes; magnitudes must survive.
        let after = session.confirmed();
        for p in 0..base.participant_count() {
            assert!((after.loading(p, 0).abs() - base.loading(p, 1).abs()).abs() < 1e-9);
            assert!((after.loading(p, 1).abs() - base.loading(p, 0).abs()).abs() < 1e-9);
        }
        assert_eq!(session.version(), 2);
    }

    #[test]
    fn oblique_method_is_rejected_in_orthogonal_mode() {
        let mut session = open();
        let err = session
            .apply_rotation(
                &RotationParams::Method {
                    method: RotationMethod::Promax,
                },
                0,
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(session.version(), 0);
    }

    #[test]
    fn close_before_confirmation_yields_no_snapshot() {
        let mut session = open();
        let (snapshot, event) = session.close(CloseReason::Requested).unwrap();
        assert!(snapshot.is_none());
        assert_eq!(event.final_version, 0);
        assert_eq!(session.phase(), SessionPhase::Closed);
    }

    #[test]
    fn close_after_confirmation_yields_snapshot() {
        let mut session = open();
        session
            .apply_rotation(
                &RotationParams::Method {
                    method: RotationMethod::Varimax,
                },
                0,
            )
            .unwrap();
        let (snapshot, _) = session.close(CloseReason::Requested).unwrap();
        let snapshot = snapshot.unwrap();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.session_id, session.id());
    }

    #[test]
    fn operations_on_closed_session_fail() {
        let mut session = open();
        session.close(CloseReason::Requested).unwrap();

        let delta = RotationDelta {
            factor_a: 0,
            factor_b: 1,
            angle_degrees: 10.0,
        };
        assert_eq!(
            session.preview(&delta).unwrap_err().code,
            ErrorCode::SessionClosed
        );
        assert_eq!(
            session
                .apply_rotation(&RotationParams::Delta { delta }, 1)
                .unwrap_err()
                .code,
            ErrorCode::SessionClosed
        );
        assert_eq!(
            session.close(CloseReason::Idle).unwrap_err().code,
            ErrorCode::SessionClosed
        );
    }

    #[test]
    fn idle_accounting_uses_last_activity() {
        let session = open();
        let later = session.last_activity().add_seconds(1801);
        assert!(session.is_idle(&later, 1800));
        assert!(!session.is_idle(&later, 3600));
    }

    #[test]
    fn matrix_params_validate_shape() {
        let mut session = open();
        let err = session
            .apply_rotation(
                &RotationParams::Matrix {
                    rows: vec![vec![1.0, 0.0]],
                },
                0,
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDimensions);
    }
}
