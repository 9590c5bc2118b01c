//! Playback Events
//!
//! Event-based communication for UI synchronization. The engine queues
//! events as it mutates state; the player task drains and broadcasts them.

use crate::types::{PlaybackStatus, RepeatMode, TrackId};
use serde::{Deserialize, Serialize};

/// Events emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Transport status changed
    StatusChanged {
        /// The new status
        status: PlaybackStatus,
    },

    /// Current track changed
    TrackChanged {
        /// ID of the new (current) track
        track_id: Option<TrackId>,
        /// ID of the previous track (if any)
        previous_track_id: Option<TrackId>,
    },

    /// Position update from the progress loop or a seek
    PositionUpdate {
        /// Current position in seconds
        position: f64,
        /// Track duration in seconds
        duration: f64,
    },

    /// Volume or mute changed
    VolumeChanged {
        /// New volume level (0.0-1.0)
        level: f64,
        /// Whether audio is muted
        muted: bool,
    },

    /// Queue changed (tracks added or cleared)
    QueueChanged {
        /// New queue length
        length: usize,
    },

    /// Shuffle toggled
    ShuffleChanged { enabled: bool },

    /// Repeat mode changed
    RepeatChanged { mode: RepeatMode },

    /// Backend failed to load the current track
    LoadFailed {
        track_id: TrackId,
        message: String,
    },
}
