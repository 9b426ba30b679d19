//! Lifecycle phases of an interactive analysis session.

use serde::{Deserialize, Serialize};

use super::StateMachine;

/// Phase of an [`AnalysisSession`](crate::domain::session::AnalysisSession).
///
/// `Created → Extracted → RotationPreview ⇄ RotationConfirmed → Closed`
///
/// Previews never mutate session state, so `RotationPreview` is a
/// transient phase a session passes through without persisting it as its
/// stored phase; the stored phase moves to `RotationConfirmed` only via
/// `apply_rotation`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Holds the Q-sort matrix only.
    Created,
    /// Holds the immutable factor solution.
    Extracted,
    /// Ephemeral preview computation in flight.
    RotationPreview,
    /// A rotation has been confirmed; results may be persisted/exported.
    RotationConfirmed,
    /// Terminal; further operations fail with `SessionClosed`.
    Closed,
}

impl SessionPhase {
    /// True once a confirmed rotation exists, i.e. results may be
    /// persisted or exported.
    pub fn is_exportable(&self) -> bool {
        matches!(self, SessionPhase::RotationConfirmed)
    }

    /// True for any phase that still accepts operations.
    pub fn is_open(&self) -> bool {
        !matches!(self, SessionPhase::Closed)
    }
}

impl StateMachine for SessionPhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SessionPhase::*;
        matches!(
            (self, target),
            (Created, Extracted)
                | (Created, Closed)
                | (Extracted, RotationPreview)
                | (Extracted, RotationConfirmed)
                | (Extracted, Closed)
                | (RotationPreview, Extracted)
                | (RotationPreview, RotationConfirmed)
                | (RotationPreview, Closed)
                | (RotationConfirmed, RotationPreview)
                | (RotationConfirmed, RotationConfirmed)
                | (RotationConfirmed, Closed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionPhase::*;
        match self {
            Created => vec![Extracted, Closed],
            Extracted => vec![RotationPreview, RotationConfirmed, Closed],
            RotationPreview => vec![Extracted, RotationConfirmed, Closed],
            RotationConfirmed => vec![RotationPreview, RotationConfirmed, Closed],
            Closed => vec![],
        }
    }
}
