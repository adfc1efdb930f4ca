//! # safeplay-demo
//!
//! Runs one playback session against the simulated primitive and walks it
//! through a prepare, a position regression, buffering, a transient fault
//! with automatic recovery, and completion.
//!
//! Pass a JSON session config path as the first argument to override the
//! defaults.

mod console;

use std::time::Instant;

use anyhow::{Context, Result};
use safeplay_core::{codes, SessionConfig, SessionState};
use safeplay_player::sim::SimFactory;
use safeplay_session::{NoFocus, PlaybackSession, SessionEvent};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MEDIA_DURATION_MS: u32 = 12_000;

fn load_config() -> Result<SessionConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(SessionConfig::default());
    };
    let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    SessionConfig::from_json(&json).with_context(|| format!("parsing {path}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "safeplay_player=debug,safeplay_session=info,view=info".into()),
        )
        .init();

    info!("Starting safeplay-demo v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let interval = config.progress_update_interval();
    let factory = SimFactory::new(MEDIA_DURATION_MS);
    let mut session = PlaybackSession::new(
        "https://media.example.com/demo.ogg",
        factory.clone(),
        NoFocus,
        config,
    );
    let events = session.subscribe();
    session.register_view(console::binding());

    match session.play(true, true) {
        Ok(()) => {}
        // Reported as an event as well; the loop below logs it.
        Err(e) if e.fault().is_some() => warn!("First play request failed: {e}"),
        Err(e) => return Err(e.into()),
    }

    let mut ticker = tokio::time::interval(interval);
    let step = u32::try_from(interval.as_millis()).unwrap_or(u32::MAX);
    let mut tick: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
        tick += 1;

        let Some(sim) = factory.latest() else {
            break;
        };
        match tick {
            2 | 24 => {
                sim.finish_prepare();
            }
            12 => {
                let raw = sim.raw_position();
                info!("Injecting a position regression at {raw}ms");
                sim.set_raw_position(raw.saturating_sub(300));
            }
            15 => sim.buffering(60),
            22 => {
                info!("Injecting a transient I/O fault");
                sim.fail(codes::MEDIA_ERROR_UNKNOWN, codes::MEDIA_ERROR_IO);
            }
            _ => sim.advance(step),
        }

        session.poll(Instant::now());

        for event in events.try_iter() {
            match event {
                SessionEvent::PrepareFailed(failure) => warn!(?failure, "Playback failed"),
                event => info!(?event, "Session event"),
            }
        }

        match session.state() {
            SessionState::Completed => {
                info!("Playback completed after {tick} ticks");
                break;
            }
            SessionState::Error => {
                warn!("Session gave up");
                break;
            }
            _ => {}
        }
    }

    session.destroy();
    Ok(())
}
