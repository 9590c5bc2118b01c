//! Core types for playback management

use serde::{Deserialize, Serialize};
use std::fmt;

/// Track identifier, unique within a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    /// Create a new track ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to decodable audio (URL or path), opaque to the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioSourceRef(String);

impl AudioSourceRef {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AudioSourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the engine can do with a track
///
/// Metadata-only tracks never get an audio session. Their transport state
/// still moves between Playing and Paused so the UI reflects intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackMedia {
    /// Backed by a decodable source
    Playable { source: AudioSourceRef },

    /// Display-only track
    MetadataOnly,
}

/// Track information for queue management
///
/// Tracks arrive fully populated and are never mutated once enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier
    pub id: TrackId,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name
    pub album: String,

    /// Cover image reference
    pub cover_art: String,

    /// Pre-supplied duration in seconds (0 when unknown).
    /// A loaded session reports the authoritative value.
    pub duration: f64,

    /// Explicit content flag
    #[serde(default)]
    pub explicit: bool,

    /// Audio source, if any
    pub media: TrackMedia,
}

impl Track {
    /// Create a track backed by an audio source
    pub fn playable(
        id: impl Into<String>,
        title: impl Into<String>,
        duration: f64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: TrackId::new(id),
            title: title.into(),
            artist: String::new(),
            album: String::new(),
            cover_art: String::new(),
            duration,
            explicit: false,
            media: TrackMedia::Playable {
                source: AudioSourceRef::new(source),
            },
        }
    }

    /// Create a display-only track
    pub fn metadata_only(id: impl Into<String>, title: impl Into<String>, duration: f64) -> Self {
        Self {
            id: TrackId::new(id),
            title: title.into(),
            artist: String::new(),
            album: String::new(),
            cover_art: String::new(),
            duration,
            explicit: false,
            media: TrackMedia::MetadataOnly,
        }
    }

    /// Set artist and album
    #[must_use]
    pub fn by(mut self, artist: impl Into<String>, album: impl Into<String>) -> Self {
        self.artist = artist.into();
        self.album = album.into();
        self
    }

    /// Audio source, if the track is playable
    pub fn source(&self) -> Option<&AudioSourceRef> {
        match &self.media {
            TrackMedia::Playable { source } => Some(source),
            TrackMedia::MetadataOnly => None,
        }
    }
}

/// Transport status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Nothing playing (empty queue, not started, or load failed)
    #[default]
    Idle,

    /// Waiting for the backend to load the current track
    Loading,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,

    /// Reached the end of the queue
    Ended,
}

impl PlaybackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when queue ends
    #[default]
    None,

    /// Loop current track only
    One,

    /// Loop entire queue
    All,
}

impl RepeatMode {
    /// Next mode in the None -> One -> All cycle
    #[must_use]
    pub fn cycle(self) -> Self {
        match self {
            Self::None => Self::One,
            Self::One => Self::All,
            Self::All => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::One => "one",
            Self::All => "all",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" | "off" => Some(Self::None),
            "one" => Some(Self::One),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies the authoritative audio session
///
/// Bumped every time the current session is torn down. Async results tagged
/// with an older generation are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SessionGeneration(u64);

impl SessionGeneration {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SessionGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Configuration for the playback engine and player task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Initial volume (0.0-1.0, default: 0.8)
    pub volume: f64,

    /// Start with shuffle enabled (default: false)
    pub shuffle: bool,

    /// Initial repeat mode (default: None)
    pub repeat: RepeatMode,

    /// Progress polling period in milliseconds (default: 50)
    pub progress_interval_ms: u64,

    /// Capacity of the player command channel (default: 32)
    pub command_buffer: usize,

    /// Seed for reproducible shuffles (default: random)
    pub shuffle_seed: Option<u64>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume: 0.8,
            shuffle: false,
            repeat: RepeatMode::None,
            progress_interval_ms: 50,
            command_buffer: 32,
            shuffle_seed: None,
        }
    }
}

impl PlaybackConfig {
    /// Reject values the player cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.progress_interval_ms == 0 {
            return Err(crate::PlaybackError::Config(
                "progress_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.command_buffer == 0 {
            return Err(crate::PlaybackError::Config(
                "command_buffer must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read-only view of playback state for the UI layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub current_track: Option<Track>,
    pub status: PlaybackStatus,
    /// Position in seconds
    pub current_time: f64,
    /// Duration of the current track in seconds (backend value once loaded)
    pub duration: f64,
    pub volume: f64,
    pub muted: bool,
    pub shuffle_enabled: bool,
    pub repeat_mode: RepeatMode,
    pub generation: SessionGeneration,
    /// Slot of the current track in play order
    pub position: Option<usize>,
    pub queue_length: usize,
}

impl PlaybackSnapshot {
    /// Progress through the current track, 0-100
    pub fn progress_percent(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    /// "m:ss" elapsed
    pub fn elapsed_label(&self) -> String {
        format_time(self.current_time)
    }

    /// "m:ss" total
    pub fn duration_label(&self) -> String {
        format_time(self.duration)
    }
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            current_track: None,
            status: PlaybackStatus::Idle,
            current_time: 0.0,
            duration: 0.0,
            volume: PlaybackConfig::default().volume,
            muted: false,
            shuffle_enabled: false,
            repeat_mode: RepeatMode::None,
            generation: SessionGeneration::default(),
            position: None,
            queue_length: 0,
        }
    }
}

/// Format seconds as "m:ss"
///
/// Fractional seconds are truncated. Negative and non-finite input renders
/// as "0:00".
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
