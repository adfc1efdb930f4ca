//! # safeplay-core
//!
//! Core types, configuration, and error handling shared by the SafePlay
//! playback crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{PlayerConfig, SessionConfig};
pub use error::{Error, Result};
pub use types::*;
