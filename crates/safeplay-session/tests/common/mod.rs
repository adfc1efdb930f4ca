//! Shared fixtures for session tests.

#![allow(dead_code)]

use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use safeplay_core::{FocusRequest, Millis, SessionConfig, StreamHint};
use safeplay_player::sim::{SimFactory, SimHandle};
use safeplay_session::{
    AudioFocus, PlayControl, PlaybackSession, PositionDisplay, ProgressControl, SessionEvent,
    ViewBinding,
};

pub const SOURCE: &str = "https://media.example.com/episode-12.mp3";

/// Everything a view was told, in one place.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub playing: bool,
    pub max: Millis,
    pub progress: Millis,
    pub secondary: Millis,
    pub duration_text: Millis,
    pub position_text: Millis,
    pub progress_writes: usize,
}

#[derive(Clone, Default)]
pub struct RecordingView {
    state: Arc<Mutex<ViewState>>,
}

impl RecordingView {
    pub fn binding(&self) -> ViewBinding {
        ViewBinding::new(self.clone(), self.clone(), self.clone())
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.lock().clone()
    }
}

impl PlayControl for RecordingView {
    fn set_playing(&mut self, playing: bool) {
        self.state.lock().playing = playing;
    }
}

impl ProgressControl for RecordingView {
    fn set_max(&mut self, max: Millis) {
        self.state.lock().max = max;
    }

    fn max(&self) -> Millis {
        self.state.lock().max
    }

    fn set_progress(&mut self, progress: Millis) {
        let mut state = self.state.lock();
        state.progress = progress;
        state.progress_writes += 1;
    }

    fn progress(&self) -> Millis {
        self.state.lock().progress
    }

    fn set_secondary_progress(&mut self, progress: Millis) {
        self.state.lock().secondary = progress;
    }
}

impl PositionDisplay for RecordingView {
    fn set_duration(&mut self, duration: Millis) {
        self.state.lock().duration_text = duration;
    }

    fn set_position(&mut self, position: Millis) {
        self.state.lock().position_text = position;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusCall {
    Request(StreamHint),
    Abandon,
}

#[derive(Clone)]
pub struct RecordingFocus {
    calls: Arc<Mutex<Vec<FocusCall>>>,
    answer: FocusRequest,
}

impl RecordingFocus {
    pub fn granting() -> Self {
        Self {
            calls: Arc::default(),
            answer: FocusRequest::Granted,
        }
    }

    pub fn denying() -> Self {
        Self {
            answer: FocusRequest::Denied,
            ..Self::granting()
        }
    }

    pub fn calls(&self) -> Vec<FocusCall> {
        self.calls.lock().clone()
    }
}

impl AudioFocus for RecordingFocus {
    fn request_focus(&mut self, hint: StreamHint) -> FocusRequest {
        self.calls.lock().push(FocusCall::Request(hint));
        self.answer
    }

    fn abandon_focus(&mut self) {
        self.calls.lock().push(FocusCall::Abandon);
    }
}

pub struct Rig {
    pub session: PlaybackSession<SimFactory>,
    pub factory: SimFactory,
    pub focus: RecordingFocus,
    pub events: Receiver<SessionEvent>,
}

impl Rig {
    pub fn new(duration: Millis) -> Self {
        Self::with_config(duration, SessionConfig::default())
    }

    pub fn with_config(duration: Millis, config: SessionConfig) -> Self {
        let factory = SimFactory::new(duration);
        let focus = RecordingFocus::granting();
        let mut session = PlaybackSession::new(SOURCE, factory.clone(), focus.clone(), config);
        let events = session.subscribe();
        Self {
            session,
            factory,
            focus,
            events,
        }
    }

    /// Handle of the session's current primitive.
    pub fn sim(&self) -> SimHandle {
        self.factory.latest().expect("session creates a primitive")
    }

    /// Play and let the prepare complete.
    pub fn start_playing(&mut self) {
        self.session.play(true, true).expect("play");
        self.sim().finish_prepare();
        self.session.pump();
    }

    pub fn drain_events(&self) -> Vec<SessionEvent> {
        self.events.try_iter().collect()
    }
}
