//! # safeplay-session
//!
//! Drives one [`SafeMediaPlayer`](safeplay_player::SafeMediaPlayer) per
//! playback target on behalf of the UI.
//!
//! This crate provides:
//! - [`PlaybackSession`], reconciling user intent with player readiness
//! - View binding that survives detach/reattach without touching playback
//! - A cancellable progress ticker for the bound progress control
//! - Audio focus handling and fault recovery
//! - [`SessionRegistry`] for one session per list item

pub mod event;
pub mod focus;
pub mod registry;
pub mod session;
pub mod ticker;
pub mod view;

pub use event::{PrepareFailure, SessionEvent};
pub use focus::{AudioFocus, NoFocus};
pub use registry::SessionRegistry;
pub use session::PlaybackSession;
pub use ticker::ProgressTicker;
pub use view::{BindingId, PlayControl, PositionDisplay, ProgressControl, ViewAction, ViewBinding};
