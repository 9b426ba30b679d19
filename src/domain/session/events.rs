//! Domain events emitted by the analysis session aggregate.

use serde::{Deserialize, Serialize};

use crate::domain::extraction::ExtractionMethod;
use crate::domain::foundation::{domain_event, EventId, SessionId, Timestamp};
use crate::domain::rotation::RotationMethod;

/// Why a session left the open states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Explicit `close_session` call.
    Requested,
    /// Reaped by the idle sweeper.
    Idle,
}

/// A session opened and extraction completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOpened {
    pub session_id: SessionId,
    pub extraction_method: ExtractionMethod,
    pub factor_count: usize,
    pub participant_count: usize,
    pub statement_count: usize,
    pub occurred_at: Timestamp,
    pub event_id: EventId,
}

domain_event!(
    SessionOpened,
    event_type = "session.opened.v1",
    aggregate_id = session_id,
    aggregate_type = "AnalysisSession",
    occurred_at = occurred_at,
    event_id = event_id
);

/// An ephemeral rotation preview was computed. Carries the confirmed
/// version it was based on; preview events have no ordering guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationPreviewed {
    pub session_id: SessionId,
    /// Confirmed version the preview started from.
    pub base_version: u64,
    pub factor_a: usize,
    pub factor_b: usize,
    pub angle_degrees: f64,
    pub occurred_at: Timestamp,
    pub event_id: EventId,
}

domain_event!(
    RotationPreviewed,
    event_type = "rotation.previewed.v1",
    aggregate_id = session_id,
    aggregate_type = "AnalysisSession",
    occurred_at = occurred_at,
    event_id = event_id
);

/// A rotation was confirmed and derived outputs were recomputed.
/// Subscribers see these strictly in `version` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfirmed {
    pub session_id: SessionId,
    /// Version after the confirmation.
    pub version: u64,
    /// `None` for manual rotations.
    pub method: Option<RotationMethod>,
    pub converged: bool,
    pub occurred_at: Timestamp,
    pub event_id: EventId,
}

domain_event!(
    RotationConfirmed,
    event_type = "rotation.confirmed.v1",
    aggregate_id = session_id,
    aggregate_type = "AnalysisSession",
    occurred_at = occurred_at,
    event_id = event_id
);

/// A session reached its terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClosed {
    pub session_id: SessionId,
    pub final_version: u64,
    pub reason: CloseReason,
    pub occurred_at: Timestamp,
    pub event_id: EventId,
}

domain_event!(
    SessionClosed,
    event_type = "session.closed.v1",
    aggregate_id = session_id,
    aggregate_type = "AnalysisSession",
    occurred_at = occurred_at,
    event_id = event_id
);
