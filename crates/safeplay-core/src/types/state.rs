//! Lifecycle states and operation outcomes.

use serde::{Deserialize, Serialize};

use super::FaultKind;

/// Position or duration in milliseconds.
pub type Millis = u32;

/// Shadow lifecycle state of the wrapped playback primitive.
///
/// Paused and stopped primitives are not separate states here: a paused
/// primitive stays `Started`, a stopped one goes back to `Prepared`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Created,
    Preparing,
    Prepared,
    Started,
}

impl PlaybackState {
    /// Whether the primitive accepts transport controls in this state.
    pub const fn accepts_controls(self) -> bool {
        matches!(self, Self::Prepared | Self::Started)
    }

    /// Whether a prepare has at least been requested.
    pub const fn is_prepared(self) -> bool {
        !matches!(self, Self::Created)
    }
}

/// What a guarded operation did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Passed through to the primitive.
    Forwarded,
    /// Recorded and applied once the primitive is ready.
    Deferred,
    /// Not valid in the given state, dropped.
    Ignored(PlaybackState),
    /// The primitive failed and the player reset itself.
    Faulted(FaultKind),
}

/// Coordinator-level view of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Preparing,
    Playing,
    Paused,
    Completed,
    Error,
}

impl SessionState {
    /// Whether the session is playing or about to.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Preparing | Self::Playing)
    }
}
