//! A view that logs what it is told instead of drawing it.

use safeplay_core::Millis;
use safeplay_session::{PlayControl, PositionDisplay, ProgressControl, ViewBinding};
use tracing::info;

#[derive(Debug, Default)]
pub struct ConsoleButton;

impl PlayControl for ConsoleButton {
    fn set_playing(&mut self, playing: bool) {
        info!(target: "view", "button: {}", if playing { "pause" } else { "play" });
    }
}

#[derive(Debug, Default)]
pub struct ConsoleBar {
    max: Millis,
    progress: Millis,
}

impl ProgressControl for ConsoleBar {
    fn set_max(&mut self, max: Millis) {
        self.max = max;
    }

    fn max(&self) -> Millis {
        self.max
    }

    fn set_progress(&mut self, progress: Millis) {
        self.progress = progress;
        let percent = u64::from(progress) * 100 / u64::from(self.max.max(1));
        info!(target: "view", "progress: {percent:>3}%");
    }

    fn progress(&self) -> Millis {
        self.progress
    }

    fn set_secondary_progress(&mut self, progress: Millis) {
        info!(target: "view", "buffered to {}", format_time(progress));
    }
}

#[derive(Debug, Default)]
pub struct ConsoleClock {
    duration: Millis,
}

impl PositionDisplay for ConsoleClock {
    fn set_duration(&mut self, duration: Millis) {
        self.duration = duration;
    }

    fn set_position(&mut self, position: Millis) {
        info!(
            target: "view",
            "{} / {}",
            format_time(position),
            format_time(self.duration)
        );
    }
}

pub fn binding() -> ViewBinding {
    ViewBinding::new(ConsoleButton, ConsoleBar::default(), ConsoleClock::default())
}

/// `m:ss` rendering of a millisecond position.
pub fn format_time(millis: Millis) -> String {
    let secs = millis / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}
