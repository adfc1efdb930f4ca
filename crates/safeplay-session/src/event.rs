//! Events a session emits to its subscriber.

use safeplay_core::PlaybackFault;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PlaybackStarted,
    PlaybackPaused,
    PlaybackCompleted,
    /// Buffered share of the stream, in percent.
    BufferingProgress(u8),
    PrepareFailed(PrepareFailure),
}

/// Why a play request did not lead to playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareFailure {
    /// The primitive faulted and automatic recovery, if any, was exhausted.
    Fault(PlaybackFault),
    /// The data source could not be set.
    SourceUnavailable(String),
}
