//! Playback session coordinator.
//!
//! A `PlaybackSession` owns one [`SafeMediaPlayer`] for one source and at most
//! one bound view. Requests come from the view, from focus changes, and from
//! the player's own callbacks; all of them run on the thread that calls into
//! the session. Player callbacks are queued on a channel and applied by
//! [`PlaybackSession::pump`], so no observer ever runs while the player is
//! borrowed.

use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use safeplay_core::{
    Error, FocusChange, FocusRequest, Millis, Outcome, PlaybackFault, PlaybackState, Result,
    SessionConfig, SessionState,
};
use safeplay_player::{FaultReport, PrimitiveFactory, SafeMediaPlayer, StartInfo};
use tracing::{debug, info, trace, warn};

use crate::event::{PrepareFailure, SessionEvent};
use crate::focus::AudioFocus;
use crate::ticker::ProgressTicker;
use crate::view::{BindingId, ViewAction, ViewBinding};

/// Player callbacks, marshaled onto the session's thread.
#[derive(Debug, Clone, Copy)]
enum PlayerSignal {
    Prepared(Millis),
    Started(StartInfo),
    Completed(Millis),
    Buffering(u8),
    Fault(FaultReport),
}

struct BoundView {
    id: BindingId,
    binding: ViewBinding,
    scrubbing: bool,
}

pub struct PlaybackSession<F: PrimitiveFactory> {
    source: String,
    config: SessionConfig,
    factory: F,
    focus: Box<dyn AudioFocus>,
    player: Option<SafeMediaPlayer<F::Primitive>>,
    signal_tx: Sender<PlayerSignal>,
    signal_rx: Receiver<PlayerSignal>,
    events: Option<Sender<SessionEvent>>,
    view: Option<BoundView>,
    next_binding: u64,
    ticker: ProgressTicker,
    buffered_position: Option<Millis>,
    focus_requested: bool,
    paused_by_focus: bool,
    completed: bool,
    last_fault: Option<PlaybackFault>,
    recoveries_left: u32,
}

impl<F: PrimitiveFactory> PlaybackSession<F> {
    /// Create a session for `source` with a fresh player.
    pub fn new(
        source: impl Into<String>,
        factory: F,
        focus: impl AudioFocus + 'static,
        config: SessionConfig,
    ) -> Self {
        let (signal_tx, signal_rx) = unbounded();
        let mut session = Self {
            source: source.into(),
            ticker: ProgressTicker::new(config.progress_update_interval()),
            recoveries_left: config.max_transient_recoveries,
            config,
            factory,
            focus: Box::new(focus),
            player: None,
            signal_tx,
            signal_rx,
            events: None,
            view: None,
            next_binding: 0,
            buffered_position: None,
            focus_requested: false,
            paused_by_focus: false,
            completed: false,
            last_fault: None,
        };
        session.create();
        session
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn source(&self) -> &str {
        &self.source
    }

    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub const fn player(&self) -> Option<&SafeMediaPlayer<F::Primitive>> {
        self.player.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.player.as_ref().is_some_and(SafeMediaPlayer::is_playing)
    }

    pub fn is_going_to_play(&self) -> bool {
        self.player
            .as_ref()
            .is_some_and(SafeMediaPlayer::is_going_to_play)
    }

    pub fn current_position(&mut self) -> Millis {
        self.player
            .as_mut()
            .map_or(0, SafeMediaPlayer::current_position)
    }

    pub fn duration(&mut self) -> Millis {
        self.player
            .as_mut()
            .map_or(self.config.player.default_duration_ms, SafeMediaPlayer::duration)
    }

    /// Coordinator-level state, derived from the player's state and intent.
    pub fn state(&self) -> SessionState {
        let Some(player) = self.player.as_ref() else {
            return SessionState::Idle;
        };
        if self.last_fault.is_some() {
            return SessionState::Error;
        }
        match player.state() {
            PlaybackState::Created => SessionState::Idle,
            PlaybackState::Preparing if player.is_going_to_play() => SessionState::Preparing,
            PlaybackState::Preparing => SessionState::Idle,
            PlaybackState::Prepared if self.completed => SessionState::Completed,
            PlaybackState::Prepared => SessionState::Idle,
            PlaybackState::Started if player.is_playing() => SessionState::Playing,
            PlaybackState::Started if self.completed => SessionState::Completed,
            PlaybackState::Started => SessionState::Paused,
        }
    }

    pub const fn last_fault(&self) -> Option<PlaybackFault> {
        self.last_fault
    }

    pub const fn has_view(&self) -> bool {
        self.view.is_some()
    }

    pub fn binding_id(&self) -> Option<BindingId> {
        self.view.as_ref().map(|view| view.id)
    }

    /// Whether a progress update is scheduled.
    pub fn is_polling(&self) -> bool {
        self.ticker.is_armed()
    }

    /// Receive session events. Replaces any earlier subscriber.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = unbounded();
        self.events = Some(tx);
        rx
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Replace the player with a fresh one. A bound view stays bound and is
    /// repainted from the fresh player's state.
    pub fn create(&mut self) {
        self.teardown_player();

        let primitive = self.factory.create();
        let mut player = SafeMediaPlayer::with_config(primitive, self.config.player);
        self.wire(&mut player);

        let stale = self.signal_rx.try_iter().count();
        if stale > 0 {
            debug!("Dropped {stale} signals from the previous player");
        }

        self.player = Some(player);
        self.ticker.cancel();
        self.completed = false;
        self.buffered_position = None;
        self.lifecycle("Session player created");

        self.sync_view();
    }

    /// Detach the view and tear the player down. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        self.detach_view();
        self.ticker.cancel();
        if self.player.is_some() {
            self.teardown_player();
            self.lifecycle("Session destroyed");
        }
        self.abandon_focus();
    }

    /// Point the session at a different source. Playback stops; the next
    /// play prepares the new source.
    pub fn set_source(&mut self, source: impl Into<String>) {
        let source = source.into();
        if source == self.source {
            return;
        }
        self.source = source;
        if let Some(player) = self.player.as_mut() {
            player.reset();
        }
        self.ticker.cancel();
        self.completed = false;
        self.last_fault = None;
        self.buffered_position = None;
        self.sync_view();
    }

    fn wire(&self, player: &mut SafeMediaPlayer<F::Primitive>) {
        let tx = self.signal_tx.clone();
        player.set_on_prepared(move |duration| {
            let _ = tx.send(PlayerSignal::Prepared(duration));
        });
        let tx = self.signal_tx.clone();
        player.set_on_start(move |info| {
            let _ = tx.send(PlayerSignal::Started(info));
        });
        let tx = self.signal_tx.clone();
        player.set_on_completion(move |duration| {
            let _ = tx.send(PlayerSignal::Completed(duration));
        });
        let tx = self.signal_tx.clone();
        player.set_on_buffering(move |percent| {
            let _ = tx.send(PlayerSignal::Buffering(percent));
        });
        let tx = self.signal_tx.clone();
        player.set_on_error(move |report| {
            let _ = tx.send(PlayerSignal::Fault(report));
        });
    }

    fn teardown_player(&mut self) {
        if let Some(mut player) = self.player.take() {
            player.clear_observers();
            player.stop();
            player.reset();
            player.release();
        }
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    /// Play, preparing the source first if needed. `update_button` repaints
    /// the play control, for requests the user did not make through it.
    ///
    /// A fault that ends the request before this returns is reported both
    /// as [`SessionEvent::PrepareFailed`] and as the returned error. Faults
    /// after that arrive as events only.
    pub fn play(&mut self, gain_focus: bool, update_button: bool) -> Result<()> {
        self.recoveries_left = self.config.max_transient_recoveries;
        self.paused_by_focus = false;
        self.play_inner(gain_focus, update_button)
    }

    fn play_inner(&mut self, gain_focus: bool, update_button: bool) -> Result<()> {
        if self.player.is_none() {
            return Err(Error::Released);
        }
        if gain_focus {
            self.gain_focus();
        }
        self.last_fault = None;
        self.completed = false;

        let source = self.source.clone();
        let Some(player) = self.player.as_mut() else {
            return Err(Error::Released);
        };

        if !player.is_prepared() {
            if let Err(e) = player.set_data_source(&source) {
                self.paint_button(false);
                self.emit(SessionEvent::PrepareFailed(PrepareFailure::SourceUnavailable(
                    e.to_string(),
                )));
                return Err(e);
            }
            if let Outcome::Faulted(kind) = player.prepare() {
                debug!(?kind, "Prepare failed");
                self.pump();
                return self.fault_result();
            }
        }
        player.start();

        self.lifecycle("Play requested");
        if update_button {
            self.paint_button(true);
        }
        self.pump();
        self.fault_result()
    }

    /// The fault the latest request ended in, as an error.
    fn fault_result(&self) -> Result<()> {
        self.last_fault.map_or(Ok(()), |fault| Err(fault.into()))
    }

    pub fn pause(&mut self, abandon_focus: bool, update_button: bool) {
        let was_active = self.state().is_active();
        if let Some(player) = self.player.as_mut() {
            player.pause();
        }
        self.ticker.cancel();

        if update_button {
            self.paint_button(false);
        }
        if abandon_focus {
            self.abandon_focus();
        }
        if was_active {
            self.lifecycle("Paused");
            self.emit(SessionEvent::PlaybackPaused);
        }
        self.pump();
    }

    pub fn seek_to(&mut self, position: i64) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        player.seek_to(position);
        let position = player.current_position();

        if let Some(view) = self.view.as_mut().filter(|view| !view.scrubbing) {
            view.binding.progress.set_progress(position);
            view.binding.display.set_position(position);
        }
        self.pump();
    }

    // ------------------------------------------------------------------
    // Audio focus
    // ------------------------------------------------------------------

    pub fn on_focus_change(&mut self, change: FocusChange) {
        debug!(?change, "Audio focus changed");
        if change == FocusChange::Gain {
            // Resuming continues the interrupted request and its recovery budget.
            if std::mem::take(&mut self.paused_by_focus) {
                if let Err(e) = self.play_inner(false, true) {
                    warn!("Failed to resume after focus gain: {e}");
                }
            }
        } else if change.is_transient_loss() {
            let active = self.state().is_active();
            self.pause(false, true);
            self.paused_by_focus = active;
        } else {
            self.paused_by_focus = false;
            self.pause(true, true);
        }
    }

    fn gain_focus(&mut self) {
        if self.focus.request_focus(self.config.stream_hint) == FocusRequest::Denied {
            warn!("Audio focus denied, playing anyway");
        }
        self.focus_requested = true;
    }

    fn abandon_focus(&mut self) {
        if std::mem::take(&mut self.focus_requested) {
            self.focus.abandon_focus();
        }
    }

    // ------------------------------------------------------------------
    // View binding
    // ------------------------------------------------------------------

    /// Bind a view, replacing any bound one, and paint it from live state.
    /// Playback is not touched.
    pub fn register_view(&mut self, binding: ViewBinding) -> BindingId {
        self.detach_view();

        self.next_binding += 1;
        let id = BindingId(self.next_binding);
        self.view = Some(BoundView {
            id,
            binding,
            scrubbing: false,
        });
        debug!(binding = id.get(), "View registered");

        self.sync_view();
        id
    }

    pub fn unregister_view(&mut self) {
        self.detach_view();
    }

    /// The view behind `id` went away. Returns false for a stale id.
    pub fn view_detached(&mut self, id: BindingId) -> bool {
        if self.binding_id() != Some(id) {
            return false;
        }
        self.detach_view();
        true
    }

    /// Apply a user action from the view bound as `id`. Actions from any
    /// other binding are dropped and false is returned.
    pub fn handle_view_action(&mut self, id: BindingId, action: ViewAction) -> bool {
        if self.binding_id() != Some(id) {
            debug!(binding = id.get(), ?action, "Ignoring action from detached view");
            return false;
        }

        match action {
            ViewAction::Play => {
                if let Err(e) = self.play(true, false) {
                    warn!("Play from view failed: {e}");
                }
            }
            ViewAction::Pause => self.pause(true, false),
            ViewAction::ScrubStarted => {
                if let Some(view) = self.view.as_mut() {
                    view.scrubbing = true;
                }
                self.ticker.cancel();
            }
            ViewAction::ScrubMoved(position) => {
                if let Some(view) = self.view.as_mut() {
                    view.binding.display.set_position(position);
                }
            }
            ViewAction::ScrubFinished(position) => {
                if let Some(view) = self.view.as_mut() {
                    view.scrubbing = false;
                }
                self.seek_to(i64::from(position));
                self.ticker.post();
            }
        }
        true
    }

    fn detach_view(&mut self) {
        if let Some(view) = self.view.take() {
            debug!(binding = view.id.get(), "View detached");
            self.ticker.cancel();
        }
    }

    fn sync_view(&mut self) {
        let (Some(player), Some(view)) = (self.player.as_mut(), self.view.as_mut()) else {
            return;
        };
        let duration = player.duration();
        let position = player.current_position();

        view.binding.display.set_duration(duration);
        view.binding.display.set_position(position);
        view.binding.play_control.set_playing(player.is_going_to_play());
        view.binding.progress.set_max(duration);
        view.binding.progress.set_progress(position);
        view.binding
            .progress
            .set_secondary_progress(self.buffered_position.unwrap_or(0));

        self.ticker.post();
    }

    fn paint_button(&mut self, playing: bool) {
        if let Some(view) = self.view.as_mut() {
            view.binding.play_control.set_playing(playing);
        }
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Apply queued primitive callbacks and player notifications.
    pub fn pump(&mut self) {
        if let Some(player) = self.player.as_mut() {
            player.dispatch_events();
        }
        while let Ok(signal) = self.signal_rx.try_recv() {
            self.handle_signal(signal);
        }
    }

    /// Pump, then run the progress update if it is due at `now`.
    pub fn poll(&mut self, now: Instant) {
        self.pump();
        if self.ticker.take_due(now) {
            self.run_progress_tick(now);
        }
    }

    fn run_progress_tick(&mut self, now: Instant) {
        let (Some(player), Some(view)) = (self.player.as_mut(), self.view.as_mut()) else {
            trace!("Progress updates stopped: nothing to update");
            return;
        };
        if view.scrubbing || !player.is_playing() {
            trace!("Progress updates stopped: not playing");
            return;
        }

        let position = player.current_position();
        view.binding.progress.set_progress(position);
        view.binding.display.set_position(position);
        self.ticker.post_delayed(now);
    }

    fn handle_signal(&mut self, signal: PlayerSignal) {
        trace!(?signal, "Player signal");
        match signal {
            PlayerSignal::Prepared(duration) => {
                if let Some(view) = self.view.as_mut() {
                    view.binding.display.set_duration(duration);
                    view.binding.progress.set_max(duration);
                }
            }
            PlayerSignal::Started(info) => self.on_started(info),
            PlayerSignal::Completed(duration) => self.on_completed(duration),
            PlayerSignal::Buffering(percent) => self.on_buffering(percent),
            PlayerSignal::Fault(report) => self.on_fault(report),
        }
    }

    fn on_started(&mut self, info: StartInfo) {
        self.completed = false;
        if let Some(view) = self.view.as_mut() {
            view.binding.display.set_duration(info.duration);
            let progress = &mut view.binding.progress;
            if progress.max() != info.duration {
                progress.set_max(info.duration);
                progress.set_progress(info.position);
            } else if progress.progress() != info.position {
                progress.set_progress(info.position);
            }
        }
        self.ticker.post();
        self.lifecycle("Playback started");
        self.emit(SessionEvent::PlaybackStarted);
    }

    fn on_completed(&mut self, duration: Millis) {
        self.completed = true;
        self.ticker.cancel();
        if let Some(view) = self.view.as_mut() {
            view.binding.progress.set_progress(duration);
            view.binding.display.set_position(duration);
            view.binding.play_control.set_playing(false);
        }
        self.abandon_focus();
        self.lifecycle("Playback completed");
        self.emit(SessionEvent::PlaybackCompleted);
    }

    fn on_buffering(&mut self, percent: u8) {
        if self.config.show_buffer_if_possible {
            let duration = self.duration();
            let buffered = (u64::from(duration) * u64::from(percent) / 100) as Millis;
            self.buffered_position = Some(buffered);
            if let Some(view) = self.view.as_mut() {
                view.binding.progress.set_secondary_progress(buffered);
            }
        }
        self.emit(SessionEvent::BufferingProgress(percent));
    }

    fn on_fault(&mut self, report: FaultReport) {
        let FaultReport {
            fault,
            was_going_to_play,
        } = report;
        self.ticker.cancel();
        self.buffered_position = None;

        if fault.is_fatal() {
            warn!(
                what = fault.what,
                extra = fault.extra,
                "Fatal playback fault, recreating player"
            );
            self.create();
        } else if was_going_to_play && self.recoveries_left > 0 {
            self.recoveries_left -= 1;
            warn!(
                what = fault.what,
                extra = fault.extra,
                "Transient playback fault, preparing {} again",
                self.source
            );
            if let Err(e) = self.play_inner(false, false) {
                debug!("Recovery failed: {e}");
            }
            return;
        } else {
            warn!(
                what = fault.what,
                extra = fault.extra,
                "Transient playback fault"
            );
        }

        self.last_fault = Some(fault);
        self.paint_button(false);
        self.emit(SessionEvent::PrepareFailed(PrepareFailure::Fault(fault)));
    }

    fn emit(&mut self, event: SessionEvent) {
        let delivered = self
            .events
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok());
        if !delivered && self.events.take().is_some() {
            trace!("Event subscriber went away");
        }
    }

    fn lifecycle(&self, message: &str) {
        if self.config.log_lifecycle {
            info!(source = %self.source, "{message}");
        } else {
            debug!(source = %self.source, "{message}");
        }
    }
}

impl<F: PrimitiveFactory> Drop for PlaybackSession<F> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::focus::NoFocus;
    use safeplay_core::codes;
    use safeplay_player::sim::SimFactory;

    fn session(duration: Millis) -> (PlaybackSession<SimFactory>, SimFactory) {
        let factory = SimFactory::new(duration);
        let session = PlaybackSession::new(
            "file:///song.ogg",
            factory.clone(),
            NoFocus,
            SessionConfig::default(),
        );
        (session, factory)
    }

    #[test]
    fn test_new_session_is_idle() {
        let (session, factory) = session(4000);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(factory.created_count(), 1);
        assert!(!session.is_polling());
    }

    #[test]
    fn test_state_follows_prepare_and_start() {
        let (mut session, factory) = session(4000);
        session.play(true, true).unwrap();
        assert_eq!(session.state(), SessionState::Preparing);

        factory.latest().unwrap().finish_prepare();
        session.pump();
        assert_eq!(session.state(), SessionState::Playing);

        session.pause(true, true);
        assert_eq!(session.state(), SessionState::Paused);
    }

    #[test]
    fn test_pause_before_prepare_completes_stays_idle() {
        let (mut session, factory) = session(4000);
        session.play(true, true).unwrap();
        session.pause(true, true);

        factory.latest().unwrap().finish_prepare();
        session.pump();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(factory.latest().unwrap().calls().start, 0);
    }

    #[test]
    fn test_transient_fault_without_intent_is_error_state() {
        let (mut session, factory) = session(4000);
        session.play(true, true).unwrap();
        let handle = factory.latest().unwrap();
        handle.finish_prepare();
        session.pump();
        session.pause(true, true);

        handle.fail(codes::MEDIA_ERROR_UNKNOWN, codes::MEDIA_ERROR_IO);
        session.pump();
        assert_eq!(session.state(), SessionState::Error);
        assert_eq!(factory.created_count(), 1);

        session.play(true, true).unwrap();
        assert_eq!(session.state(), SessionState::Preparing);
        assert!(session.last_fault().is_none());
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let (mut session, factory) = session(4000);
        session.destroy();
        session.destroy();

        assert!(session.player().is_none());
        assert_eq!(factory.latest().unwrap().calls().release, 1);
        assert!(matches!(session.play(true, true), Err(Error::Released)));
    }

    #[test]
    fn test_set_source_resets_player() {
        let (mut session, factory) = session(4000);
        session.play(true, true).unwrap();
        factory.latest().unwrap().finish_prepare();
        session.pump();

        session.set_source("file:///other.ogg");
        assert_eq!(session.source(), "file:///other.ogg");
        assert_eq!(session.state(), SessionState::Idle);

        session.play(true, true).unwrap();
        assert_eq!(
            factory.latest().unwrap().source().as_deref(),
            Some("file:///other.ogg")
        );
    }
}
