//! Player and session configuration.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Millis, StreamHint};

/// Forced forward step applied when the primitive reports a regressed position.
pub const DEFAULT_MIN_STEP_MS: Millis = 128;

/// Duration assumed before the primitive reports a real one.
pub const DEFAULT_DURATION_MS: Millis = 100;

/// Interval between progress polls while playing.
pub const PROGRESS_UPDATE_INTERVAL_MS: u64 = 200;

/// Tuning for a single `SafeMediaPlayer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub min_step_ms: Millis,
    pub default_duration_ms: Millis,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            min_step_ms: DEFAULT_MIN_STEP_MS,
            default_duration_ms: DEFAULT_DURATION_MS,
        }
    }
}

/// Settings for a playback session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub progress_update_interval_ms: u64,
    /// Mirror buffering progress onto the progress control's secondary bar.
    pub show_buffer_if_possible: bool,
    pub stream_hint: StreamHint,
    /// Automatic re-prepares after a transient fault, per play request.
    pub max_transient_recoveries: u32,
    /// Log session lifecycle at `info` instead of `debug`.
    pub log_lifecycle: bool,
    pub player: PlayerConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            progress_update_interval_ms: PROGRESS_UPDATE_INTERVAL_MS,
            show_buffer_if_possible: false,
            stream_hint: StreamHint::default(),
            max_transient_recoveries: 1,
            log_lifecycle: false,
            player: PlayerConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.progress_update_interval_ms == 0 {
            return Err(Error::Config(
                "progress_update_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.player.default_duration_ms == 0 {
            return Err(Error::Config(
                "player.default_duration_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub const fn progress_update_interval(&self) -> Duration {
        Duration::from_millis(self.progress_update_interval_ms)
    }
}
