//! Riff - Playback Engine
//!
//! Queue, transport and audio-session coordination for Riff.
//!
//! This crate provides:
//! - Queue with a separate play order (shuffle keeps the enqueue order)
//! - Transport state machine (Idle, Loading, Playing, Paused, Ended)
//! - Repeat modes (None, One, All)
//! - Volume with mute
//! - Generation-tagged session loads (late results are discarded)
//! - Position polling while playing
//!
//! # Architecture
//!
//! `riff-playback` never decodes audio. A platform supplies an
//! [`AudioBackend`] that loads a source into an [`AudioSession`].
//!
//! - [`PlaybackEngine`] is the synchronous state machine. Transitions that
//!   pick a playable track return a [`LoadRequest`]; the caller runs it and
//!   hands the tagged result back.
//! - [`Player`] owns an engine on a tokio task and does that plumbing:
//!   loads, end-of-track signals and progress ticks.
//!
//! # Example: Engine
//!
//! ```rust
//! use riff_playback::{PlaybackConfig, PlaybackEngine, PlaybackStatus, RepeatMode, Track};
//!
//! let mut engine = PlaybackEngine::new(&PlaybackConfig::default());
//! engine.add_to_queue(vec![
//!     Track::playable("a", "Intro", 10.0, "/music/a.mp3"),
//!     Track::metadata_only("b", "Preview", 20.0),
//! ]);
//! engine.set_repeat(RepeatMode::All);
//!
//! // Playable track: the caller must run the load
//! let request = engine.resume().expect("load request");
//! assert_eq!(request.source.as_str(), "/music/a.mp3");
//! assert_eq!(engine.status(), PlaybackStatus::Loading);
//!
//! // Metadata-only track: plays without a session
//! assert!(engine.next_track().is_none());
//! assert_eq!(engine.status(), PlaybackStatus::Playing);
//! ```
//!
//! # Example: Player
//!
//! ```rust,no_run
//! use riff_playback::{AudioBackend, PlaybackConfig, Player, Track};
//! use std::sync::Arc;
//!
//! # async fn run(backend: Arc<dyn AudioBackend>) -> riff_playback::Result<()> {
//! let player = Player::spawn(PlaybackConfig::default(), backend, Vec::new())?;
//!
//! player
//!     .play_track(Track::playable("a", "Intro", 10.0, "/music/a.mp3"))
//!     .await?;
//! player.set_volume(0.5).await?;
//!
//! let snapshot = player.snapshot();
//! println!("{} / {}", snapshot.elapsed_label(), snapshot.duration_label());
//!
//! player.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod events;
mod player;
mod progress;
mod queue;
mod session;
mod shuffle;
pub mod types;
mod volume;

// Public exports
pub use engine::{LoadResolution, PlaybackEngine};
pub use error::{PlaybackError, Result};
pub use events::PlaybackEvent;
pub use player::{PlayOutcome, Player};
pub use progress::ProgressSynchronizer;
pub use queue::Queue;
pub use session::{
    AudioBackend, AudioSession, EndSignal, LoadCompletion, LoadRequest, LoadedSession,
};
pub use types::{
    format_time, AudioSourceRef, PlaybackConfig, PlaybackSnapshot, PlaybackStatus, RepeatMode,
    SessionGeneration, Track, TrackId, TrackMedia,
};
pub use volume::Volume;
