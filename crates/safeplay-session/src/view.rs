//! View binding surface.
//!
//! A session holds its bound view as a back-reference only. The view talks
//! back through [`ViewAction`]s tagged with the [`BindingId`] it was given at
//! registration, so actions from a detached view are dropped.

use safeplay_core::Millis;

/// Play/pause toggle.
pub trait PlayControl {
    fn set_playing(&mut self, playing: bool);
}

/// Seek bar style control.
pub trait ProgressControl {
    fn set_max(&mut self, max: Millis);

    fn max(&self) -> Millis;

    fn set_progress(&mut self, progress: Millis);

    fn progress(&self) -> Millis;

    /// Buffered position, drawn behind the progress.
    fn set_secondary_progress(&mut self, progress: Millis);
}

/// Textual position and duration.
pub trait PositionDisplay {
    fn set_duration(&mut self, duration: Millis);

    fn set_position(&mut self, position: Millis);
}

/// The controls making up one player view.
pub struct ViewBinding {
    pub play_control: Box<dyn PlayControl>,
    pub progress: Box<dyn ProgressControl>,
    pub display: Box<dyn PositionDisplay>,
}

impl ViewBinding {
    pub fn new(
        play_control: impl PlayControl + 'static,
        progress: impl ProgressControl + 'static,
        display: impl PositionDisplay + 'static,
    ) -> Self {
        Self {
            play_control: Box::new(play_control),
            progress: Box::new(progress),
            display: Box::new(display),
        }
    }
}

/// Token identifying one registration of a view with a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(pub(crate) u64);

impl BindingId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// User interaction reported by a bound view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    Play,
    Pause,
    /// A drag on the progress control began.
    ScrubStarted,
    /// The drag moved; only the display follows.
    ScrubMoved(Millis),
    /// The drag ended at this position.
    ScrubFinished(Millis),
}
