//! # safeplay-player
//!
//! State-guarded playback on top of a fragile platform primitive.
//!
//! Features:
//! - Shadow lifecycle state so misuse never reaches the primitive
//! - Deferred start and seek while an asynchronous prepare is in flight
//! - Monotonic position reporting over a jittery raw position
//! - A deterministic simulated primitive for tests and demos

pub mod observer;
pub mod player;
pub mod primitive;
pub mod sim;
pub mod smoother;

pub use observer::{FaultReport, StartInfo};
pub use player::{PositionFix, SafeMediaPlayer};
pub use primitive::{EventSink, MediaPrimitive, PrimitiveEvent, PrimitiveFactory};
pub use smoother::PositionSmoother;
