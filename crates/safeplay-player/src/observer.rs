//! Single-subscriber notification slots.
//!
//! Each event kind has one slot; registering replaces whatever was there.

use safeplay_core::{Millis, PlaybackFault};

/// Snapshot taken when playback becomes active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartInfo {
    pub position: Millis,
    pub duration: Millis,
}

/// A fault, after the player has already reset itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultReport {
    pub fault: PlaybackFault,
    /// Whether the caller wanted playback when the fault hit.
    pub was_going_to_play: bool,
}

type Slot<T> = Option<Box<dyn FnMut(T) + Send>>;

#[derive(Default)]
pub(crate) struct Observers {
    pub(crate) on_prepared: Slot<Millis>,
    pub(crate) on_start: Slot<StartInfo>,
    pub(crate) on_completion: Slot<Millis>,
    pub(crate) on_buffering: Slot<u8>,
    pub(crate) on_error: Slot<FaultReport>,
}

impl Observers {
    pub(crate) fn prepared(&mut self, duration: Millis) {
        if let Some(observer) = self.on_prepared.as_mut() {
            observer(duration);
        }
    }

    pub(crate) fn started(&mut self, info: StartInfo) {
        if let Some(observer) = self.on_start.as_mut() {
            observer(info);
        }
    }

    pub(crate) fn completed(&mut self, duration: Millis) {
        if let Some(observer) = self.on_completion.as_mut() {
            observer(duration);
        }
    }

    pub(crate) fn buffering(&mut self, percent: u8) {
        if let Some(observer) = self.on_buffering.as_mut() {
            observer(percent);
        }
    }

    pub(crate) fn error(&mut self, report: FaultReport) {
        if let Some(observer) = self.on_error.as_mut() {
            observer(report);
        }
    }
}
