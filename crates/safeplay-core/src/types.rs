//! Core domain types for SafePlay.

pub mod fault;
pub mod focus;
pub mod state;

pub use fault::{codes, FaultKind, PlaybackFault, PrimitiveError};
pub use focus::{FocusChange, FocusRequest, StreamHint};
pub use state::{Millis, Outcome, PlaybackState, SessionState};
