//! Deterministic in-process primitive.
//!
//! `SimulatedPrimitive` follows the platform primitive's lifecycle rules,
//! including failing on calls made in a state it does not allow. Nothing
//! happens on its own: a [`SimHandle`] finishes prepares, moves the playhead,
//! injects glitches, errors, and buffering updates.

use std::sync::Arc;

use parking_lot::Mutex;
use safeplay_core::{Millis, PrimitiveError};
use tracing::trace;

use crate::primitive::{EventSink, MediaPrimitive, PrimitiveEvent, PrimitiveFactory};

/// Lifecycle phase of the simulated primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimPhase {
    #[default]
    Idle,
    Initialized,
    Preparing,
    Prepared,
    Started,
    Paused,
    Stopped,
    Completed,
    Error,
    Released,
}

impl SimPhase {
    const fn has_media(self) -> bool {
        matches!(
            self,
            Self::Prepared | Self::Started | Self::Paused | Self::Stopped | Self::Completed
        )
    }
}

/// Per-operation call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimCalls {
    pub set_source: u32,
    pub prepare: u32,
    pub start: u32,
    pub pause: u32,
    pub stop: u32,
    pub seek: u32,
    pub reset: u32,
    pub release: u32,
}

#[derive(Debug, Default)]
struct SimState {
    phase: SimPhase,
    source: Option<String>,
    media_duration: Millis,
    position: Millis,
    sink: Option<EventSink>,
    calls: SimCalls,
    illegal_calls: u32,
    seeks: Vec<Millis>,
    fail_next_source: bool,
    fail_next_stop: bool,
}

impl SimState {
    fn emit(&self, event: PrimitiveEvent) {
        if let Some(sink) = &self.sink {
            let _ = sink.send(event);
        }
    }

    fn illegal(&mut self, op: &'static str) -> Result<(), PrimitiveError> {
        trace!(phase = ?self.phase, "Simulated primitive rejected {op}");
        self.illegal_calls += 1;
        Err(PrimitiveError::IllegalState(op))
    }
}

/// Simulated platform primitive.
pub struct SimulatedPrimitive {
    shared: Arc<Mutex<SimState>>,
}

impl SimulatedPrimitive {
    /// A primitive whose media turns out to be `media_duration` long once prepared.
    pub fn new(media_duration: Millis) -> (Self, SimHandle) {
        let shared = Arc::new(Mutex::new(SimState {
            media_duration,
            ..SimState::default()
        }));
        let handle = SimHandle {
            shared: Arc::clone(&shared),
        };
        (Self { shared }, handle)
    }
}

impl MediaPrimitive for SimulatedPrimitive {
    fn set_event_sink(&mut self, sink: EventSink) {
        self.shared.lock().sink = Some(sink);
    }

    fn set_data_source(&mut self, source: &str) -> Result<(), PrimitiveError> {
        let mut state = self.shared.lock();
        state.calls.set_source += 1;
        if state.phase != SimPhase::Idle {
            return state.illegal("set_data_source");
        }
        if std::mem::take(&mut state.fail_next_source) {
            return Err(PrimitiveError::Io(format!("cannot open {source}")));
        }
        state.source = Some(source.to_string());
        state.phase = SimPhase::Initialized;
        Ok(())
    }

    fn prepare_async(&mut self) -> Result<(), PrimitiveError> {
        let mut state = self.shared.lock();
        state.calls.prepare += 1;
        match state.phase {
            SimPhase::Initialized | SimPhase::Stopped => {
                state.phase = SimPhase::Preparing;
                Ok(())
            }
            _ => state.illegal("prepare_async"),
        }
    }

    fn start(&mut self) -> Result<(), PrimitiveError> {
        let mut state = self.shared.lock();
        state.calls.start += 1;
        match state.phase {
            SimPhase::Completed => {
                state.position = 0;
                state.phase = SimPhase::Started;
                Ok(())
            }
            SimPhase::Prepared | SimPhase::Started | SimPhase::Paused => {
                state.phase = SimPhase::Started;
                Ok(())
            }
            _ => state.illegal("start"),
        }
    }

    fn pause(&mut self) -> Result<(), PrimitiveError> {
        let mut state = self.shared.lock();
        state.calls.pause += 1;
        match state.phase {
            SimPhase::Started | SimPhase::Paused | SimPhase::Completed => {
                state.phase = SimPhase::Paused;
                Ok(())
            }
            _ => state.illegal("pause"),
        }
    }

    fn stop(&mut self) -> Result<(), PrimitiveError> {
        let mut state = self.shared.lock();
        state.calls.stop += 1;
        if std::mem::take(&mut state.fail_next_stop) {
            return Err(PrimitiveError::Media { what: 1, extra: 0 });
        }
        if state.phase.has_media() {
            state.phase = SimPhase::Stopped;
            Ok(())
        } else {
            state.illegal("stop")
        }
    }

    fn seek_to(&mut self, position: Millis) -> Result<(), PrimitiveError> {
        let mut state = self.shared.lock();
        state.calls.seek += 1;
        if state.phase.has_media() && state.phase != SimPhase::Stopped {
            state.position = position.min(state.media_duration);
            state.seeks.push(position);
            Ok(())
        } else {
            state.illegal("seek_to")
        }
    }

    fn reset(&mut self) {
        let mut state = self.shared.lock();
        state.calls.reset += 1;
        if state.phase != SimPhase::Released {
            state.phase = SimPhase::Idle;
            state.source = None;
            state.position = 0;
        }
    }

    fn release(&mut self) {
        let mut state = self.shared.lock();
        state.calls.release += 1;
        state.phase = SimPhase::Released;
        state.sink = None;
    }

    fn is_playing(&self) -> bool {
        self.shared.lock().phase == SimPhase::Started
    }

    fn current_position(&self) -> Millis {
        self.shared.lock().position
    }

    fn duration(&self) -> Option<Millis> {
        let state = self.shared.lock();
        state.phase.has_media().then_some(state.media_duration)
    }
}

/// Scripting and inspection side of a [`SimulatedPrimitive`].
#[derive(Clone)]
pub struct SimHandle {
    shared: Arc<Mutex<SimState>>,
}

impl SimHandle {
    /// Complete an in-flight prepare. Returns false if none was in flight.
    pub fn finish_prepare(&self) -> bool {
        let mut state = self.shared.lock();
        if state.phase != SimPhase::Preparing {
            return false;
        }
        state.phase = SimPhase::Prepared;
        state.emit(PrimitiveEvent::Prepared);
        true
    }

    /// Move the playhead forward while started, completing at the end.
    pub fn advance(&self, millis: Millis) {
        let mut state = self.shared.lock();
        if state.phase != SimPhase::Started {
            return;
        }
        state.position = state.position.saturating_add(millis);
        if state.position >= state.media_duration {
            state.position = state.media_duration;
            state.phase = SimPhase::Completed;
            state.emit(PrimitiveEvent::Completion);
        }
    }

    /// Force the raw position, e.g. to simulate a codec regression.
    pub fn set_raw_position(&self, position: Millis) {
        self.shared.lock().position = position;
    }

    /// Change the duration the media reports.
    pub fn set_media_duration(&self, duration: Millis) {
        self.shared.lock().media_duration = duration;
    }

    pub fn buffering(&self, percent: u8) {
        self.shared.lock().emit(PrimitiveEvent::BufferingUpdate(percent));
    }

    /// Enter the error state and report it.
    pub fn fail(&self, what: i32, extra: i32) {
        let mut state = self.shared.lock();
        state.phase = SimPhase::Error;
        state.emit(PrimitiveEvent::Error { what, extra });
    }

    pub fn fail_next_source(&self) {
        self.shared.lock().fail_next_source = true;
    }

    pub fn fail_next_stop(&self) {
        self.shared.lock().fail_next_stop = true;
    }

    pub fn phase(&self) -> SimPhase {
        self.shared.lock().phase
    }

    pub fn source(&self) -> Option<String> {
        self.shared.lock().source.clone()
    }

    pub fn raw_position(&self) -> Millis {
        self.shared.lock().position
    }

    pub fn calls(&self) -> SimCalls {
        self.shared.lock().calls
    }

    /// Calls the primitive rejected for being made in the wrong phase.
    pub fn illegal_calls(&self) -> u32 {
        self.shared.lock().illegal_calls
    }

    /// Seek targets the primitive accepted, in order.
    pub fn seeks(&self) -> Vec<Millis> {
        self.shared.lock().seeks.clone()
    }
}

/// Factory producing simulated primitives and remembering their handles.
#[derive(Clone)]
pub struct SimFactory {
    media_duration: Millis,
    created: Arc<Mutex<Vec<SimHandle>>>,
}

impl SimFactory {
    pub fn new(media_duration: Millis) -> Self {
        Self {
            media_duration,
            created: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    /// Handle of the most recently created primitive.
    pub fn latest(&self) -> Option<SimHandle> {
        self.created.lock().last().cloned()
    }

    pub fn handles(&self) -> Vec<SimHandle> {
        self.created.lock().clone()
    }
}

impl PrimitiveFactory for SimFactory {
    type Primitive = SimulatedPrimitive;

    fn create(&mut self) -> SimulatedPrimitive {
        let (primitive, handle) = SimulatedPrimitive::new(self.media_duration);
        self.created.lock().push(handle);
        primitive
    }
}
