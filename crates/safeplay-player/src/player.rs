//! State-guarded façade over a [`MediaPrimitive`].
//!
//! The raw primitive fails on calls made in the wrong phase of its lifecycle.
//! `SafeMediaPlayer` keeps a shadow [`PlaybackState`] and decides, per call,
//! whether to forward, defer until the primitive is ready, or drop. It also
//! holds an authoritative position while the primitive cannot report one and
//! smooths the raw position once it can.

use crossbeam_channel::{unbounded, Receiver};
use safeplay_core::{
    Error, Millis, Outcome, PlaybackFault, PlaybackState, PlayerConfig, PrimitiveError, Result,
};
use tracing::{debug, trace, warn};

use crate::observer::{FaultReport, Observers, StartInfo};
use crate::primitive::{MediaPrimitive, PrimitiveEvent};
use crate::smoother::PositionSmoother;

/// Where `current_position` comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionFix {
    /// Held value, used until playback starts.
    Fixed(Millis),
    /// Live primitive position through the smoother.
    Tracked,
}

pub struct SafeMediaPlayer<P: MediaPrimitive> {
    primitive: P,
    events: Receiver<PrimitiveEvent>,
    config: PlayerConfig,
    state: PlaybackState,
    going_to_play: bool,
    position: PositionFix,
    smoother: PositionSmoother,
    duration: Millis,
    has_source: bool,
    /// The primitive was stopped and needs a prepare before it plays again.
    stopped: bool,
    released: bool,
    observers: Observers,
}

impl<P: MediaPrimitive> SafeMediaPlayer<P> {
    pub fn new(primitive: P) -> Self {
        Self::with_config(primitive, PlayerConfig::default())
    }

    pub fn with_config(mut primitive: P, config: PlayerConfig) -> Self {
        let (sink, events) = unbounded();
        primitive.set_event_sink(sink);

        Self {
            primitive,
            events,
            config,
            state: PlaybackState::Created,
            going_to_play: false,
            position: PositionFix::Fixed(0),
            smoother: PositionSmoother::new(config.min_step_ms),
            duration: config.default_duration_ms,
            has_source: false,
            stopped: false,
            released: false,
            observers: Observers::default(),
        }
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Called with the reconciled duration once a prepare completes.
    pub fn set_on_prepared(&mut self, observer: impl FnMut(Millis) + Send + 'static) {
        self.observers.on_prepared = Some(Box::new(observer));
    }

    /// Called once per transition into active playback.
    pub fn set_on_start(&mut self, observer: impl FnMut(StartInfo) + Send + 'static) {
        self.observers.on_start = Some(Box::new(observer));
    }

    pub fn set_on_completion(&mut self, observer: impl FnMut(Millis) + Send + 'static) {
        self.observers.on_completion = Some(Box::new(observer));
    }

    pub fn set_on_buffering(&mut self, observer: impl FnMut(u8) + Send + 'static) {
        self.observers.on_buffering = Some(Box::new(observer));
    }

    /// Called after the player has reset itself following a fault.
    pub fn set_on_error(&mut self, observer: impl FnMut(FaultReport) + Send + 'static) {
        self.observers.on_error = Some(Box::new(observer));
    }

    pub fn clear_observers(&mut self) {
        self.observers = Observers::default();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    /// The caller's latest play/pause intent.
    pub const fn is_going_to_play(&self) -> bool {
        self.going_to_play
    }

    /// Whether a prepare was at least requested.
    pub const fn is_prepared(&self) -> bool {
        self.state.is_prepared()
    }

    pub fn is_started(&self) -> bool {
        self.state == PlaybackState::Started
    }

    pub fn is_playing(&self) -> bool {
        !self.released && self.is_started() && self.primitive.is_playing()
    }

    pub const fn has_source(&self) -> bool {
        self.has_source
    }

    /// Whether the primitive was stopped since it was last prepared.
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub const fn is_released(&self) -> bool {
        self.released
    }

    pub const fn position_fix(&self) -> PositionFix {
        self.position
    }

    /// Duration as last reconciled, without asking the primitive.
    pub const fn cached_duration(&self) -> Millis {
        self.duration
    }

    pub const fn primitive(&self) -> &P {
        &self.primitive
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub fn set_data_source(&mut self, source: &str) -> Result<()> {
        if self.released {
            return Err(Error::Released);
        }
        if self.state != PlaybackState::Created || self.has_source {
            trace!(state = ?self.state, "Data source already set, ignoring {source}");
            return Ok(());
        }

        self.primitive.set_data_source(source).map_err(|e| {
            warn!("Failed to set data source {source}: {e}");
            Error::SourceUnavailable(format!("{source}: {e}"))
        })?;
        self.has_source = true;
        Ok(())
    }

    /// Start an asynchronous prepare, either from `Created` with a source or
    /// after a stop. Any earlier play intent is dropped; call
    /// [`start`](Self::start) afterwards to play once ready.
    pub fn prepare(&mut self) -> Outcome {
        if self.released {
            return Outcome::Ignored(self.state);
        }
        self.going_to_play = false;

        let from_created = self.state == PlaybackState::Created && self.has_source;
        if !from_created && !self.stopped {
            trace!(state = ?self.state, has_source = self.has_source, "prepare ignored");
            return Outcome::Ignored(self.state);
        }
        self.prepare_async()
    }

    fn prepare_async(&mut self) -> Outcome {
        match self.primitive.prepare_async() {
            Ok(()) => {
                self.stopped = false;
                self.transition(PlaybackState::Preparing);
                Outcome::Forwarded
            }
            Err(e) => self.fail("prepare", &e),
        }
    }

    pub fn start(&mut self) -> Outcome {
        if self.released {
            return Outcome::Ignored(self.state);
        }
        self.going_to_play = true;

        if self.stopped {
            // Prepare again; the kept intent starts playback once prepared.
            debug!("Start after stop, preparing again");
            return match self.prepare_async() {
                Outcome::Forwarded => Outcome::Deferred,
                outcome => outcome,
            };
        }
        if !self.state.accepts_controls() {
            trace!(state = ?self.state, "start deferred");
            return if self.state == PlaybackState::Preparing {
                Outcome::Deferred
            } else {
                Outcome::Ignored(self.state)
            };
        }

        let starting = !self.primitive.is_playing();
        if let Err(e) = self.primitive.start() {
            return self.fail("start", &e);
        }
        self.transition(PlaybackState::Started);

        if starting {
            self.position = PositionFix::Tracked;
            self.smoother.clear();
            let info = StartInfo {
                position: self.current_position(),
                duration: self.duration(),
            };
            debug!(position = info.position, duration = info.duration, "Playback started");
            self.observers.started(info);
        }
        Outcome::Forwarded
    }

    pub fn pause(&mut self) -> Outcome {
        if self.released {
            return Outcome::Ignored(self.state);
        }
        self.going_to_play = false;

        match self.state {
            PlaybackState::Started => match self.primitive.pause() {
                Ok(()) => Outcome::Forwarded,
                Err(e) => self.fail("pause", &e),
            },
            // Remembered through the cleared intent; prepare will not auto-start.
            PlaybackState::Preparing => Outcome::Deferred,
            state => Outcome::Ignored(state),
        }
    }

    /// Seek, clamped to `[0, duration]`. Before the primitive is prepared the
    /// target is held and applied when the prepare completes.
    pub fn seek_to(&mut self, position: i64) -> Outcome {
        if self.released {
            return Outcome::Ignored(self.state);
        }
        let target = self.clamp_position(position);

        if self.accepts_controls() {
            if let Err(e) = self.primitive.seek_to(target) {
                return self.fail("seek", &e);
            }
            self.position = PositionFix::Tracked;
            self.smoother.set(target);
            Outcome::Forwarded
        } else {
            trace!(target, state = ?self.state, "Holding seek until prepared");
            self.position = PositionFix::Fixed(target);
            self.smoother.clear();
            Outcome::Deferred
        }
    }

    /// Stop playback. The shadow state returns to `Prepared` and the
    /// position is held; the next `prepare` or `start` prepares the
    /// primitive again before anything else reaches it.
    pub fn stop(&mut self) -> Outcome {
        if self.released {
            return Outcome::Ignored(self.state);
        }
        self.going_to_play = false;

        if !self.accepts_controls() {
            return Outcome::Ignored(self.state);
        }

        let position = self.current_position();
        // Stopped either way.
        if let Err(e) = self.primitive.stop() {
            debug!("Ignoring stop failure: {e}");
        }
        self.stopped = true;
        self.position = PositionFix::Fixed(position);
        self.smoother.clear();
        self.transition(PlaybackState::Prepared);
        Outcome::Forwarded
    }

    /// Return to `Created`, dropping the data source and any queued callbacks.
    pub fn reset(&mut self) {
        if !self.released {
            self.primitive.reset();
        }

        let dropped = self.events.try_iter().count();
        if dropped > 0 {
            debug!("Discarded {dropped} stale primitive events");
        }

        self.going_to_play = false;
        self.position = PositionFix::Fixed(0);
        self.smoother.clear();
        self.duration = self.config.default_duration_ms;
        self.has_source = false;
        self.stopped = false;
        self.transition(PlaybackState::Created);
    }

    /// Free the primitive. Every later call is ignored.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.primitive.release();
        self.released = true;
        self.going_to_play = false;
        self.has_source = false;
        self.stopped = false;
        self.events.try_iter().for_each(drop);
        self.clear_observers();
        self.transition(PlaybackState::Created);
    }

    // ------------------------------------------------------------------
    // Position and duration
    // ------------------------------------------------------------------

    pub fn current_position(&mut self) -> Millis {
        match self.position {
            PositionFix::Fixed(position) => position,
            PositionFix::Tracked => {
                if self.released || !self.accepts_controls() {
                    return self.smoother.last_reported().unwrap_or(0);
                }
                let raw = self.primitive.current_position();
                let duration = self.duration();
                self.smoother.get(raw, duration)
            }
        }
    }

    /// Duration, refreshed from the primitive when it can report one.
    pub fn duration(&mut self) -> Millis {
        self.refresh_duration();
        self.duration
    }

    fn refresh_duration(&mut self) {
        if self.released || !self.state.accepts_controls() {
            return;
        }
        let Some(reported) = self.primitive.duration().filter(|d| *d > 0) else {
            return;
        };
        if reported == self.duration {
            return;
        }

        if let PositionFix::Fixed(position) = self.position {
            let scaled = rescale(position, self.duration, reported);
            debug!(from = position, to = scaled, "Rescaled held position");
            self.position = PositionFix::Fixed(scaled);
        }
        debug!(from = self.duration, to = reported, "Duration changed");
        self.duration = reported;
    }

    /// Whether controls can go straight to the primitive.
    const fn accepts_controls(&self) -> bool {
        self.state.accepts_controls() && !self.stopped
    }

    fn clamp_position(&self, position: i64) -> Millis {
        position.clamp(0, i64::from(self.duration)) as Millis
    }

    // ------------------------------------------------------------------
    // Primitive callbacks
    // ------------------------------------------------------------------

    /// Apply every callback the primitive has queued. Must run on the thread
    /// that owns the player.
    pub fn dispatch_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            handled += 1;
            self.handle_event(event);
        }
        handled
    }

    pub fn handle_event(&mut self, event: PrimitiveEvent) {
        if self.released {
            trace!(?event, "Dropping event for released player");
            return;
        }
        match event {
            PrimitiveEvent::Prepared => self.on_prepared(),
            PrimitiveEvent::Completion => self.on_completion(),
            PrimitiveEvent::BufferingUpdate(percent) => self.observers.buffering(percent.min(100)),
            PrimitiveEvent::Error { what, extra } => {
                let fault = PlaybackFault::classify(what, extra);
                warn!(what, extra, kind = ?fault.kind, "Primitive reported an error");
                self.handle_fault(fault);
            }
        }
    }

    fn on_prepared(&mut self) {
        if self.state != PlaybackState::Preparing {
            debug!(state = ?self.state, "Discarding stale prepared callback");
            return;
        }
        self.transition(PlaybackState::Prepared);
        self.reconcile_position();

        let duration = self.duration;
        self.observers.prepared(duration);

        if self.going_to_play {
            self.start();
        }
    }

    /// Rescale a held position against the real duration and hand it to the
    /// primitive.
    fn reconcile_position(&mut self) {
        self.refresh_duration();

        if let PositionFix::Fixed(position) = self.position {
            let position = position.min(self.duration);
            self.position = PositionFix::Fixed(position);
            if position > 0 {
                if let Err(e) = self.primitive.seek_to(position) {
                    warn!("Failed to restore position {position}: {e}");
                }
            }
        }
    }

    fn on_completion(&mut self) {
        if self.state != PlaybackState::Started {
            debug!(state = ?self.state, "Discarding stale completion callback");
            return;
        }
        self.going_to_play = false;

        let duration = self.duration();
        self.position = PositionFix::Fixed(duration);
        self.smoother.clear();

        debug!(duration, "Playback completed");
        self.observers.completed(duration);
    }

    fn fail(&mut self, op: &'static str, err: &PrimitiveError) -> Outcome {
        warn!("Primitive rejected {op}: {err}");
        let fault = err.to_fault();
        self.handle_fault(fault);
        Outcome::Faulted(fault.kind)
    }

    fn handle_fault(&mut self, fault: PlaybackFault) {
        let was_going_to_play = self.going_to_play;
        // The primitive has to be prepared again after an error.
        self.reset();
        self.observers.error(FaultReport {
            fault,
            was_going_to_play,
        });
    }

    fn transition(&mut self, next: PlaybackState) {
        if self.state != next {
            debug!("Player state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

/// `position / old * new`, kept within `new`.
fn rescale(position: Millis, old: Millis, new: Millis) -> Millis {
    let scaled = u64::from(position) * u64::from(new) / u64::from(old.max(1));
    scaled.min(u64::from(new)) as Millis
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sim::{SimHandle, SimulatedPrimitive};
    use parking_lot::Mutex;
    use safeplay_core::{codes, FaultKind};
    use std::sync::Arc;

    fn player(duration: Millis) -> (SafeMediaPlayer<SimulatedPrimitive>, SimHandle) {
        let (primitive, handle) = SimulatedPrimitive::new(duration);
        (SafeMediaPlayer::new(primitive), handle)
    }

    fn prepared(duration: Millis) -> (SafeMediaPlayer<SimulatedPrimitive>, SimHandle) {
        let (mut player, handle) = player(duration);
        player.set_data_source("file:///clip.ogg").ok();
        player.prepare();
        handle.finish_prepare();
        player.dispatch_events();
        (player, handle)
    }

    #[test]
    fn test_rescale() {
        assert_eq!(rescale(50, 100, 10_000), 5000);
        assert_eq!(rescale(0, 100, 10_000), 0);
        assert_eq!(rescale(100, 100, 3000), 3000);
        assert_eq!(rescale(10, 0, 3000), 3000);
    }

    #[test]
    fn test_initial_state() {
        let (mut player, handle) = player(5000);
        assert_eq!(player.state(), PlaybackState::Created);
        assert_eq!(player.current_position(), 0);
        assert_eq!(player.duration(), 100);
        assert!(!player.is_going_to_play());
        assert_eq!(handle.illegal_calls(), 0);
    }

    #[test]
    fn test_prepare_requires_source() {
        let (mut player, handle) = player(5000);
        assert_eq!(player.prepare(), Outcome::Ignored(PlaybackState::Created));
        assert_eq!(handle.calls().prepare, 0);
    }

    #[test]
    fn test_controls_before_prepare_never_reach_primitive() {
        let (mut player, handle) = player(5000);
        assert_eq!(player.start(), Outcome::Ignored(PlaybackState::Created));
        assert_eq!(player.pause(), Outcome::Ignored(PlaybackState::Created));
        assert_eq!(player.stop(), Outcome::Ignored(PlaybackState::Created));
        assert_eq!(player.seek_to(40), Outcome::Deferred);
        assert_eq!(player.current_position(), 40);

        let calls = handle.calls();
        assert_eq!(calls.start + calls.pause + calls.stop + calls.seek, 0);
        assert_eq!(handle.illegal_calls(), 0);
    }

    #[test]
    fn test_start_while_preparing_defers() {
        let (mut player, handle) = player(5000);
        player.set_data_source("file:///clip.ogg").ok();
        assert_eq!(player.prepare(), Outcome::Forwarded);
        assert_eq!(player.start(), Outcome::Deferred);
        assert_eq!(handle.calls().start, 0);

        handle.finish_prepare();
        player.dispatch_events();

        assert!(player.is_started());
        assert!(player.is_playing());
        assert_eq!(handle.calls().start, 1);
    }

    #[test]
    fn test_pause_while_preparing_cancels_autostart() {
        let (mut player, handle) = player(5000);
        player.set_data_source("file:///clip.ogg").ok();
        player.prepare();
        player.start();
        assert_eq!(player.pause(), Outcome::Deferred);

        handle.finish_prepare();
        player.dispatch_events();

        assert_eq!(player.state(), PlaybackState::Prepared);
        assert_eq!(handle.calls().start, 0);
    }

    #[test]
    fn test_on_start_fires_once_per_transition() {
        let (mut player, _handle) = prepared(5000);
        let starts = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&starts);
        player.set_on_start(move |_| *counter.lock() += 1);

        player.start();
        player.start();
        assert_eq!(*starts.lock(), 1);

        player.pause();
        player.pause();
        player.start();
        assert_eq!(*starts.lock(), 2);
    }

    #[test]
    fn test_seek_before_prepare_is_rescaled() {
        let (mut player, handle) = player(10_000);
        player.set_data_source("file:///clip.ogg").ok();
        player.seek_to(50);
        player.prepare();
        handle.finish_prepare();
        player.dispatch_events();

        assert_eq!(player.current_position(), 5000);
        assert_eq!(handle.seeks(), vec![5000]);

        player.start();
        assert_eq!(player.position_fix(), PositionFix::Tracked);
        assert_eq!(player.current_position(), 5000);
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let (mut player, handle) = prepared(3000);
        player.seek_to(-20);
        assert_eq!(player.current_position(), 0);
        player.seek_to(9000);
        assert_eq!(handle.seeks(), vec![0, 3000]);
    }

    #[test]
    fn test_stop_swallows_primitive_failure() {
        let (mut player, handle) = prepared(3000);
        player.start();
        handle.fail_next_stop();
        assert_eq!(player.stop(), Outcome::Forwarded);
        assert_eq!(player.state(), PlaybackState::Prepared);
        assert!(!player.is_going_to_play());
    }

    #[test]
    fn test_stop_then_prepare_plays_again() {
        let (mut player, handle) = prepared(3000);
        player.start();
        handle.advance(1200);

        assert_eq!(player.stop(), Outcome::Forwarded);
        assert_eq!(player.state(), PlaybackState::Prepared);
        assert!(player.is_stopped());
        assert_eq!(player.position_fix(), PositionFix::Fixed(1200));

        assert_eq!(player.prepare(), Outcome::Forwarded);
        assert_eq!(player.state(), PlaybackState::Preparing);
        handle.finish_prepare();
        player.dispatch_events();
        assert_eq!(player.start(), Outcome::Forwarded);

        assert!(player.is_started());
        assert!(player.is_playing());
        assert!(player.has_source());
        assert_eq!(player.current_position(), 1200);
        assert_eq!(handle.calls().prepare, 2);
        assert_eq!(handle.illegal_calls(), 0);
    }

    #[test]
    fn test_start_after_stop_prepares_first() {
        let (mut player, handle) = prepared(3000);
        player.start();
        player.stop();

        assert_eq!(player.start(), Outcome::Deferred);
        assert_eq!(player.state(), PlaybackState::Preparing);
        assert!(player.is_going_to_play());
        assert_eq!(handle.calls().start, 1);

        handle.finish_prepare();
        player.dispatch_events();
        assert!(player.is_playing());
        assert_eq!(handle.calls().start, 2);
        assert_eq!(handle.illegal_calls(), 0);
    }

    #[test]
    fn test_seek_after_stop_is_held() {
        let (mut player, handle) = prepared(3000);
        player.start();
        player.stop();

        assert_eq!(player.seek_to(900), Outcome::Deferred);
        assert_eq!(player.stop(), Outcome::Ignored(PlaybackState::Prepared));
        assert_eq!(handle.calls().seek, 0);

        player.prepare();
        handle.finish_prepare();
        player.dispatch_events();
        assert_eq!(handle.seeks(), vec![900]);
        assert_eq!(handle.illegal_calls(), 0);
    }

    #[test]
    fn test_stale_prepared_after_reset_is_discarded() {
        let (mut player, handle) = player(5000);
        player.set_data_source("file:///clip.ogg").ok();
        player.prepare();
        player.start();
        handle.finish_prepare();
        player.reset();

        assert_eq!(player.dispatch_events(), 0);
        player.handle_event(PrimitiveEvent::Prepared);
        assert_eq!(player.state(), PlaybackState::Created);
        assert_eq!(handle.calls().start, 0);
    }

    #[test]
    fn test_completion_holds_duration() {
        let (mut player, handle) = prepared(3000);
        let completed = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&completed);
        player.set_on_completion(move |d| *slot.lock() = Some(d));

        player.start();
        handle.advance(5000);
        player.dispatch_events();

        assert_eq!(*completed.lock(), Some(3000));
        assert_eq!(player.current_position(), 3000);
        assert!(!player.is_going_to_play());
        assert!(!player.is_playing());
    }

    #[test]
    fn test_error_resets_and_reports() {
        let (mut player, handle) = prepared(3000);
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        player.set_on_error(move |report| sink.lock().push(report));

        player.start();
        handle.fail(codes::MEDIA_ERROR_SERVER_DIED, 0);
        player.dispatch_events();

        assert_eq!(player.state(), PlaybackState::Created);
        assert!(!player.has_source());
        assert_eq!(player.duration(), 100);
        let reports = reports.lock();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].fault.kind, FaultKind::Fatal);
        assert!(reports[0].was_going_to_play);
    }

    #[test]
    fn test_source_failure_keeps_created() {
        let (mut player, handle) = player(3000);
        handle.fail_next_source();
        let err = player.set_data_source("content://gone").unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable(_)));
        assert_eq!(player.state(), PlaybackState::Created);
        assert!(!player.has_source());
    }

    #[test]
    fn test_release_ignores_everything() {
        let (mut player, handle) = prepared(3000);
        player.release();
        assert_eq!(player.start(), Outcome::Ignored(PlaybackState::Created));
        assert!(matches!(player.set_data_source("x"), Err(Error::Released)));
        assert_eq!(handle.calls().release, 1);
        assert_eq!(handle.illegal_calls(), 0);
    }
}
