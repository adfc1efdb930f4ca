//! Audio focus types.

use serde::{Deserialize, Serialize};

/// Stream the session plays on, passed along with focus requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamHint {
    #[default]
    Music,
    VoiceCall,
    Notification,
    Alarm,
}

/// Result of a focus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRequest {
    Granted,
    Denied,
}

/// Focus change delivered by the audio focus service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    Gain,
    /// Permanent loss.
    Loss,
    LossTransient,
    LossTransientCanDuck,
}

impl FocusChange {
    /// Whether focus is expected to come back on its own.
    pub const fn is_transient_loss(self) -> bool {
        matches!(self, Self::LossTransient | Self::LossTransientCanDuck)
    }
}
