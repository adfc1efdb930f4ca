//! Monotonic filter over the primitive's raw playback position.
//!
//! Some codecs make the primitive report a position lower than one it already
//! reported. Showing that verbatim makes a progress bar jump backward, so a
//! regression is answered with a small forced step forward instead, and the
//! regressed raw value is remembered. A following raw value above it shows
//! the stream is advancing again; one at or below it means the stream is not
//! moving, and the reported value holds.
//!
//! Explicit seeks and completion reset the baseline through [`PositionSmoother::set`]
//! and [`PositionSmoother::clear`].

use safeplay_core::config::DEFAULT_MIN_STEP_MS;
use safeplay_core::Millis;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSmoother {
    min_step: Millis,
    last_reported: Option<Millis>,
    pending_step_back: Option<Millis>,
}

impl PositionSmoother {
    pub const fn new(min_step: Millis) -> Self {
        Self {
            min_step,
            last_reported: None,
            pending_step_back: None,
        }
    }

    /// Filter one raw reading against the media duration.
    pub fn get(&mut self, raw: Millis, duration: Millis) -> Millis {
        let last = match self.last_reported {
            Some(last) if raw < last => last,
            _ => {
                self.last_reported = Some(raw);
                self.pending_step_back = None;
                return raw;
            }
        };

        let advancing = self
            .pending_step_back
            .map_or(true, |step_back| raw > step_back);
        let reported = if advancing {
            // Never below `last`, even if the duration shrank under it.
            last.saturating_add(self.min_step).min(duration).max(last)
        } else {
            last
        };

        trace!(
            raw,
            last,
            reported,
            advancing,
            "Suppressed position regression"
        );

        self.last_reported = Some(reported);
        self.pending_step_back = Some(raw);
        reported
    }

    /// Rebase on a known position, e.g. a seek target.
    pub fn set(&mut self, position: Millis) {
        self.last_reported = Some(position);
        self.pending_step_back = None;
    }

    /// Forget the baseline; the next reading is accepted as is.
    pub fn clear(&mut self) {
        self.last_reported = None;
        self.pending_step_back = None;
    }

    pub const fn last_reported(&self) -> Option<Millis> {
        self.last_reported
    }

    pub const fn pending_step_back(&self) -> Option<Millis> {
        self.pending_step_back
    }
}

impl Default for PositionSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_STEP_MS)
    }
}
