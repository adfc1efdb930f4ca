//! One session per playback target.
//!
//! List style hosts recycle their item views. The registry keys sessions by
//! target id so a recycled view rebinds to the session already playing its
//! item instead of spawning a second player.

use std::collections::HashMap;
use std::time::Instant;

use safeplay_core::SessionConfig;
use safeplay_player::PrimitiveFactory;
use tracing::debug;

use crate::session::PlaybackSession;
use crate::view::{BindingId, ViewBinding};

type SessionBuilder<F> = Box<dyn FnMut(&str, SessionConfig) -> PlaybackSession<F>>;

pub struct SessionRegistry<F: PrimitiveFactory> {
    sessions: HashMap<u64, PlaybackSession<F>>,
    config: SessionConfig,
    builder: SessionBuilder<F>,
}

impl<F: PrimitiveFactory> SessionRegistry<F> {
    /// `builder` creates the session for a target the registry has not seen.
    pub fn new(
        config: SessionConfig,
        builder: impl FnMut(&str, SessionConfig) -> PlaybackSession<F> + 'static,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
            builder: Box::new(builder),
        }
    }

    /// Bind `view` to the session for `id`, creating the session on first
    /// use. A known target keeps its player; only a changed source resets it.
    pub fn register(
        &mut self,
        id: u64,
        source: &str,
        show_buffer: bool,
        view: ViewBinding,
    ) -> BindingId {
        let session = match self.sessions.entry(id) {
            std::collections::hash_map::Entry::Occupied(entry) => {
                let session = entry.into_mut();
                if session.source() != source {
                    debug!(id, "Session source changed to {source}");
                    session.set_source(source);
                }
                session
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                debug!(id, "Creating session for {source}");
                let config = SessionConfig {
                    show_buffer_if_possible: show_buffer,
                    ..self.config.clone()
                };
                entry.insert((self.builder)(source, config))
            }
        };
        session.register_view(view)
    }

    pub fn get(&self, id: u64) -> Option<&PlaybackSession<F>> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut PlaybackSession<F>> {
        self.sessions.get_mut(&id)
    }

    /// Poll every session, bound or headless.
    pub fn poll(&mut self, now: Instant) {
        for session in self.sessions.values_mut() {
            session.poll(now);
        }
    }

    /// Destroy and forget the session for `id`. Returns false if unknown.
    pub fn destroy(&mut self, id: u64) -> bool {
        self.sessions.remove(&id).is_some_and(|mut session| {
            session.destroy();
            true
        })
    }

    pub fn destroy_all(&mut self) {
        for (_, mut session) in self.sessions.drain() {
            session.destroy();
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<F: PrimitiveFactory> Drop for SessionRegistry<F> {
    fn drop(&mut self) {
        self.destroy_all();
    }
}
