//! Interactive session aggregate and its domain events.

mod aggregate;
mod events;

pub use aggregate::{
    AnalysisSession, ConfirmedRotation, RotationParams, SessionSettings, SessionSnapshot,
};
pub use events::{CloseReason, RotationConfirmed, RotationPreviewed, SessionClosed, SessionOpened};
