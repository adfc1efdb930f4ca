//! Error types for SafePlay.

use thiserror::Error;

use crate::types::{FaultKind, PlaybackFault};

/// Result type alias using SafePlay's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for SafePlay.
#[derive(Error, Debug)]
pub enum Error {
    // Playback faults
    #[error("Transient playback fault (what={what}, extra={extra})")]
    TransientFault { what: i32, extra: i32 },

    #[error("Fatal playback fault (what={what}, extra={extra})")]
    FatalFault { what: i32, extra: i32 },

    // Source errors
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Player has been released")]
    Released,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The playback fault carried by this error, if any.
    pub const fn fault(&self) -> Option<PlaybackFault> {
        match *self {
            Self::TransientFault { what, extra } => Some(PlaybackFault {
                kind: FaultKind::Transient,
                what,
                extra,
            }),
            Self::FatalFault { what, extra } => Some(PlaybackFault {
                kind: FaultKind::Fatal,
                what,
                extra,
            }),
            _ => None,
        }
    }
}

impl From<PlaybackFault> for Error {
    fn from(fault: PlaybackFault) -> Self {
        let PlaybackFault { kind, what, extra } = fault;
        match kind {
            FaultKind::Transient => Self::TransientFault { what, extra },
            FaultKind::Fatal => Self::FatalFault { what, extra },
        }
    }
}
