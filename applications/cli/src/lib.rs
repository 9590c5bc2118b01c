//! Riff CLI - terminal driver for the playback engine
//!
//! Loads a track list from configuration and plays it through
//! [`riff_playback::Player`] against a simulated, clock-driven backend.

pub mod config;
pub mod driver;
pub mod error;
pub mod simulated;
