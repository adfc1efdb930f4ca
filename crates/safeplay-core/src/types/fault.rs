//! Primitive failures and their classification.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Platform media error codes.
pub mod codes {
    /// Unspecified media error.
    pub const MEDIA_ERROR_UNKNOWN: i32 = 1;
    /// The media server died; the primitive object is unusable.
    pub const MEDIA_ERROR_SERVER_DIED: i32 = 100;

    pub const MEDIA_ERROR_IO: i32 = -1004;
    pub const MEDIA_ERROR_MALFORMED: i32 = -1007;
    pub const MEDIA_ERROR_UNSUPPORTED: i32 = -1010;
    pub const MEDIA_ERROR_TIMED_OUT: i32 = -110;
    /// Operation called in a state the primitive does not allow.
    pub const INVALID_OPERATION: i32 = -38;
}

/// How bad a playback fault is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultKind {
    /// A reset and re-prepare recovers.
    Transient,
    /// The primitive must be destroyed and recreated.
    Fatal,
}

/// A fault reported by, or derived from, the playback primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackFault {
    pub kind: FaultKind,
    pub what: i32,
    pub extra: i32,
}

impl PlaybackFault {
    /// Classify a platform `(what, extra)` pair. Only a dead media server is fatal.
    pub const fn classify(what: i32, extra: i32) -> Self {
        let kind = if what == codes::MEDIA_ERROR_SERVER_DIED {
            FaultKind::Fatal
        } else {
            FaultKind::Transient
        };
        Self { kind, what, extra }
    }

    pub const fn is_fatal(&self) -> bool {
        matches!(self.kind, FaultKind::Fatal)
    }
}

/// Raw failure returned by a primitive call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    #[error("Illegal state for {0}")]
    IllegalState(&'static str),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Media error (what={what}, extra={extra})")]
    Media { what: i32, extra: i32 },
}

impl PrimitiveError {
    /// Convert into a classified fault.
    pub const fn to_fault(&self) -> PlaybackFault {
        match *self {
            Self::IllegalState(_) => {
                PlaybackFault::classify(codes::MEDIA_ERROR_UNKNOWN, codes::INVALID_OPERATION)
            }
            Self::Io(_) => PlaybackFault::classify(codes::MEDIA_ERROR_UNKNOWN, codes::MEDIA_ERROR_IO),
            Self::Media { what, extra } => PlaybackFault::classify(what, extra),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_died_is_fatal() {
        assert!(PlaybackFault::classify(codes::MEDIA_ERROR_SERVER_DIED, 0).is_fatal());
        assert!(!PlaybackFault::classify(codes::MEDIA_ERROR_UNKNOWN, codes::MEDIA_ERROR_IO).is_fatal());
    }

    #[test]
    fn test_primitive_error_to_fault() {
        let fault = PrimitiveError::IllegalState("start").to_fault();
        assert_eq!(fault.kind, FaultKind::Transient);
        assert_eq!(fault.extra, codes::INVALID_OPERATION);

        let fault = PrimitiveError::Media { what: 100, extra: -1010 }.to_fault();
        assert_eq!(fault.kind, FaultKind::Fatal);
    }
}
