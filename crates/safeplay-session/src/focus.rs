//! Audio focus service seam.

use safeplay_core::{FocusRequest, StreamHint};

/// Process audio focus arbitration. Each session holds its own handle and
/// reacts to its own focus changes.
pub trait AudioFocus {
    fn request_focus(&mut self, hint: StreamHint) -> FocusRequest;

    fn abandon_focus(&mut self);
}

/// Grants every request. For hosts without focus arbitration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFocus;

impl AudioFocus for NoFocus {
    fn request_focus(&mut self, _hint: StreamHint) -> FocusRequest {
        FocusRequest::Granted
    }

    fn abandon_focus(&mut self) {}
}
