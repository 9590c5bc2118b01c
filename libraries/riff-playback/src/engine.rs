//! Playback engine - core orchestration
//!
//! Coordinates the queue, transport status, volume, shuffle/repeat and the
//! single live audio session.
//!
//! The engine is synchronous and owns all state. Loading is the only step
//! that has to wait on the backend, so the engine never performs it: every
//! transition that selects a playable track bumps the session generation and
//! returns a [`LoadRequest`]. The caller runs the load and feeds the tagged
//! result back through [`PlaybackEngine::complete_load`]. Results whose
//! generation is no longer current are dropped after their session has been
//! stopped.

use crate::{
    error::PlaybackError,
    events::PlaybackEvent,
    queue::Queue,
    session::{AudioSession, LoadCompletion, LoadRequest, LoadedSession},
    types::{
        PlaybackConfig, PlaybackSnapshot, PlaybackStatus, RepeatMode, SessionGeneration, Track,
        TrackId,
    },
    volume::Volume,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

/// What happened to a load result handed back to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResolution {
    /// Session installed; playing (or paused, if the user paused while loading)
    Started,

    /// Load failed; status is back to Idle
    Failed(PlaybackError),

    /// Result belonged to a superseded generation and was discarded
    Stale,
}

/// Central playback state machine
///
/// Status transitions:
///
/// ```text
/// Idle -> Loading -> Playing <-> Paused
///                    Playing -> Ended      (end of queue, no repeat)
///                    Ended   -> Loading    (advance / resume)
///           any   -> Idle                  (clear_queue, load failure)
/// ```
pub struct PlaybackEngine {
    // State
    status: PlaybackStatus,
    current_time: f64,
    duration: f64,

    queue: Queue,

    // Settings
    volume: Volume,
    shuffle_enabled: bool,
    repeat: RepeatMode,

    // Session tracking
    generation: SessionGeneration,
    session: Option<Box<dyn AudioSession>>,
    pending_load: Option<SessionGeneration>,

    rng: StdRng,

    // Event queue for UI synchronization
    pending_events: Vec<PlaybackEvent>,
}

impl PlaybackEngine {
    /// Create an engine with an empty queue
    pub fn new(config: &PlaybackConfig) -> Self {
        Self::with_queue(config, Vec::new())
    }

    /// Create an engine with initial tracks
    ///
    /// `config.shuffle` is applied after the tracks are queued so that the
    /// initial queue is actually shuffled. Nothing has played yet, so the
    /// first slot of the shuffled order becomes current.
    pub fn with_queue(config: &PlaybackConfig, tracks: Vec<Track>) -> Self {
        let rng = match config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut engine = Self {
            status: PlaybackStatus::Idle,
            current_time: 0.0,
            duration: 0.0,
            queue: Queue::new(),
            volume: Volume::new(config.volume),
            shuffle_enabled: false,
            repeat: config.repeat,
            generation: SessionGeneration::default(),
            session: None,
            pending_load: None,
            rng,
            pending_events: Vec::new(),
        };

        engine.add_to_queue(tracks);
        if config.shuffle {
            engine.set_shuffle(true);
            engine.queue.set_position(0);
            engine.duration = engine.queue.current().map_or(0.0, |t| t.duration.max(0.0));
        }
        engine.pending_events.clear();
        engine
    }

    // ===== Transport =====

    /// Play a specific track
    ///
    /// Tracks not yet queued are appended first. Returns the load to run
    /// for playable tracks; metadata-only tracks start immediately.
    pub fn play_track(&mut self, track: Track) -> Option<LoadRequest> {
        let slot = match self.queue.slot_of(&track.id) {
            Some(slot) => slot,
            None => {
                let id = track.id.clone();
                self.add_to_queue(vec![track]);
                self.queue.slot_of(&id)?
            }
        };
        self.play_slot(slot)
    }

    /// Pause playback
    ///
    /// No-op without a current track or when nothing is playing. Pausing
    /// while loading keeps the session paused once it arrives.
    pub fn pause(&mut self) {
        if self.queue.current().is_none() {
            return;
        }

        if matches!(
            self.status,
            PlaybackStatus::Playing | PlaybackStatus::Loading
        ) {
            if let Some(session) = self.session.as_mut() {
                session.pause();
            }
            self.set_status(PlaybackStatus::Paused);
        }
    }

    /// Resume playback
    ///
    /// From Paused this continues the live session (or the degraded-mode
    /// track). From Idle or Ended the current slot is played again.
    pub fn resume(&mut self) -> Option<LoadRequest> {
        let slot = self.queue.position()?;

        match self.status {
            PlaybackStatus::Paused => {
                if let Some(session) = self.session.as_mut() {
                    session.play();
                }
                self.set_status(PlaybackStatus::Playing);
                None
            }
            PlaybackStatus::Idle | PlaybackStatus::Ended => self.play_slot(slot),
            PlaybackStatus::Playing | PlaybackStatus::Loading => None,
        }
    }

    /// Pause when playing, resume otherwise
    pub fn toggle_play_pause(&mut self) -> Option<LoadRequest> {
        match self.status {
            PlaybackStatus::Playing | PlaybackStatus::Loading => {
                self.pause();
                None
            }
            _ => self.resume(),
        }
    }

    /// Seek to a position in seconds, clamped to the current duration
    pub fn seek_to(&mut self, time: f64) {
        let target = clamp_time(time, self.duration);

        if let Some(session) = self.session.as_mut() {
            session.seek(target);
        }

        self.current_time = target;
        self.emit_position_update();
    }

    /// Seek to a fraction (0.0-1.0) of the current duration
    pub fn seek_to_percent(&mut self, fraction: f64) {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.seek_to(self.duration * fraction);
    }

    /// Skip forward in play order
    pub fn next_track(&mut self) -> Option<LoadRequest> {
        let slot = self.queue.position()?;

        if self.repeat == RepeatMode::One {
            return self.play_slot(slot);
        }

        if slot + 1 < self.queue.len() {
            self.play_slot(slot + 1)
        } else if self.repeat == RepeatMode::All {
            self.play_slot(0)
        } else {
            self.stop_at_boundary();
            None
        }
    }

    /// Skip backward in play order
    pub fn previous_track(&mut self) -> Option<LoadRequest> {
        let slot = self.queue.position()?;

        if self.repeat == RepeatMode::One {
            return self.play_slot(slot);
        }

        if slot > 0 {
            self.play_slot(slot - 1)
        } else if self.repeat == RepeatMode::All {
            self.play_slot(self.queue.len() - 1)
        } else {
            self.stop_at_boundary();
            None
        }
    }

    // ===== Backend callbacks =====

    /// Hand back the result of a [`LoadRequest`]
    pub fn complete_load(&mut self, completion: LoadCompletion) -> LoadResolution {
        let LoadCompletion { generation, result } = completion;

        if self.pending_load != Some(generation) {
            debug!(
                %generation,
                current = %self.generation,
                "Discarding stale load result"
            );
            if let Ok(LoadedSession { mut session, .. }) = result {
                session.stop();
            }
            return LoadResolution::Stale;
        }
        self.pending_load = None;

        match result {
            Ok(LoadedSession {
                mut session,
                duration,
            }) => {
                if duration.is_finite() && duration > 0.0 {
                    self.duration = duration;
                }
                self.current_time = 0.0;
                session.set_volume(self.volume.output_level());

                if self.status == PlaybackStatus::Paused {
                    debug!(%generation, "Session ready, staying paused");
                } else {
                    session.play();
                    self.set_status(PlaybackStatus::Playing);
                }

                self.session = Some(session);
                self.emit_position_update();
                LoadResolution::Started
            }
            Err(err) => {
                warn!(%generation, error = %err, "Audio load failed");
                self.set_status(PlaybackStatus::Idle);
                if let Some(track) = self.queue.current() {
                    self.pending_events.push(PlaybackEvent::LoadFailed {
                        track_id: track.id.clone(),
                        message: err.to_string(),
                    });
                }
                LoadResolution::Failed(err)
            }
        }
    }

    /// The session for `generation` finished its playthrough
    ///
    /// Releases the spent session and advances like [`Self::next_track`].
    pub fn track_ended(&mut self, generation: SessionGeneration) -> Option<LoadRequest> {
        if generation != self.generation || self.session.is_none() {
            debug!(%generation, current = %self.generation, "Ignoring stale end-of-track");
            return None;
        }

        if let Some(track) = self.queue.current() {
            info!(track_id = %track.id, "Track finished");
        }
        self.release_session();
        self.next_track()
    }

    /// Mirror the live session's position into `current_time`
    ///
    /// Only while playing with a live session. Returns true if the position
    /// changed.
    pub fn sync_position(&mut self) -> bool {
        if self.status != PlaybackStatus::Playing {
            return false;
        }
        let Some(session) = self.session.as_ref() else {
            return false;
        };

        let position = clamp_time(session.position(), self.duration);
        if position == self.current_time {
            return false;
        }

        self.current_time = position;
        self.emit_position_update();
        true
    }

    // ===== Volume =====

    /// Set volume (clamped to 0.0-1.0)
    pub fn set_volume(&mut self, level: f64) {
        self.volume.set_level(level);
        self.apply_volume();
    }

    /// Mute audio
    pub fn mute(&mut self) {
        self.volume.mute();
        self.apply_volume();
    }

    /// Unmute audio
    pub fn unmute(&mut self) {
        self.volume.unmute();
        self.apply_volume();
    }

    /// Toggle mute state
    pub fn toggle_mute(&mut self) {
        self.volume.toggle_mute();
        self.apply_volume();
    }

    // ===== Queue Management =====

    /// Append tracks to the queue
    ///
    /// Tracks go to the end of play order even while shuffled. Ids that are
    /// already queued are skipped.
    pub fn add_to_queue(&mut self, tracks: Vec<Track>) {
        if tracks.is_empty() {
            return;
        }

        let was_empty = self.queue.is_empty();
        for track in self.queue.append(tracks) {
            warn!(track_id = %track.id, "Skipping track already in queue");
        }

        if was_empty {
            if let Some(track) = self.queue.current() {
                self.duration = track.duration.max(0.0);
                let track_id = track.id.clone();
                self.pending_events.push(PlaybackEvent::TrackChanged {
                    track_id: Some(track_id),
                    previous_track_id: None,
                });
            }
        }

        self.emit_queue_changed();
    }

    /// Stop playback and empty the queue
    ///
    /// Volume, mute, shuffle and repeat settings are kept.
    pub fn clear_queue(&mut self) {
        let previous = self.current_track_id();

        self.invalidate_session();
        self.queue.clear();
        self.current_time = 0.0;
        self.duration = 0.0;
        self.set_status(PlaybackStatus::Idle);

        if previous.is_some() {
            self.pending_events.push(PlaybackEvent::TrackChanged {
                track_id: None,
                previous_track_id: previous,
            });
        }
        self.emit_queue_changed();
    }

    // ===== Shuffle & Repeat =====

    /// Flip shuffle on or off
    pub fn toggle_shuffle(&mut self) {
        self.set_shuffle(!self.shuffle_enabled);
    }

    /// Enable or disable shuffle
    ///
    /// Enabling draws a fresh permutation of the current queue; disabling
    /// restores enqueue order. Either way the current track stays current.
    pub fn set_shuffle(&mut self, enabled: bool) {
        if self.shuffle_enabled == enabled {
            return;
        }

        self.shuffle_enabled = enabled;
        if enabled {
            self.queue.shuffle(&mut self.rng);
        } else {
            self.queue.restore_original_order();
        }

        debug!(enabled, "Shuffle changed");
        self.pending_events.push(PlaybackEvent::ShuffleChanged { enabled });
    }

    /// Cycle repeat None -> One -> All -> None
    pub fn toggle_repeat(&mut self) -> RepeatMode {
        self.set_repeat(self.repeat.cycle());
        self.repeat
    }

    /// Set repeat mode
    pub fn set_repeat(&mut self, mode: RepeatMode) {
        if self.repeat != mode {
            self.repeat = mode;
            self.pending_events.push(PlaybackEvent::RepeatChanged { mode });
        }
    }

    // ===== Lifecycle =====

    /// Stop the live session and invalidate any in-flight load
    pub fn shutdown(&mut self) {
        self.invalidate_session();
        if matches!(
            self.status,
            PlaybackStatus::Playing | PlaybackStatus::Paused | PlaybackStatus::Loading
        ) {
            self.set_status(PlaybackStatus::Idle);
        }
    }

    // ===== State Queries =====

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current()
    }

    /// Position in seconds
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Duration of the current track in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn volume(&self) -> f64 {
        self.volume.level()
    }

    pub fn is_muted(&self) -> bool {
        self.volume.is_muted()
    }

    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle_enabled
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Whether an audio session is currently live
    pub fn has_live_session(&self) -> bool {
        self.session.is_some()
    }

    /// Whether a load for the current generation is outstanding
    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Read-only view for the UI
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            current_track: self.queue.current().cloned(),
            status: self.status,
            current_time: self.current_time,
            duration: self.duration,
            volume: self.volume.level(),
            muted: self.volume.is_muted(),
            shuffle_enabled: self.shuffle_enabled,
            repeat_mode: self.repeat,
            generation: self.generation,
            position: self.queue.position(),
            queue_length: self.queue.len(),
        }
    }

    // ===== Events =====

    /// Drain all pending events
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Check if there are pending events
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    // ===== Internals =====

    /// Tear down the current session and start a new generation on `slot`
    fn play_slot(&mut self, slot: usize) -> Option<LoadRequest> {
        let previous = self.current_track_id();

        self.invalidate_session();
        if !self.queue.set_position(slot) {
            return None;
        }
        let track = self.queue.current()?.clone();

        self.current_time = 0.0;
        self.duration = track.duration.max(0.0);

        if previous.as_ref() != Some(&track.id) {
            self.pending_events.push(PlaybackEvent::TrackChanged {
                track_id: Some(track.id.clone()),
                previous_track_id: previous,
            });
        }
        self.emit_position_update();

        match track.source() {
            Some(source) => {
                info!(track_id = %track.id, generation = %self.generation, "Loading track");
                self.pending_load = Some(self.generation);
                self.set_status(PlaybackStatus::Loading);
                Some(LoadRequest {
                    generation: self.generation,
                    track_id: track.id.clone(),
                    source: source.clone(),
                })
            }
            None => {
                info!(track_id = %track.id, "Playing metadata-only track");
                self.set_status(PlaybackStatus::Playing);
                None
            }
        }
    }

    /// End of queue without repeat: stop but keep the current track
    fn stop_at_boundary(&mut self) {
        self.invalidate_session();
        self.current_time = 0.0;
        self.set_status(PlaybackStatus::Ended);
        self.emit_position_update();
    }

    /// Release the live session and supersede any outstanding load
    fn invalidate_session(&mut self) {
        self.release_session();
        self.generation = self.generation.next();
        self.pending_load = None;
    }

    fn release_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
    }

    fn apply_volume(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.set_volume(self.volume.output_level());
        }
        self.pending_events.push(PlaybackEvent::VolumeChanged {
            level: self.volume.level(),
            muted: self.volume.is_muted(),
        });
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        if self.status != status {
            debug!(from = %self.status, to = %status, "Status changed");
            self.status = status;
            self.pending_events.push(PlaybackEvent::StatusChanged { status });
        }
    }

    fn current_track_id(&self) -> Option<TrackId> {
        self.queue.current().map(|t| t.id.clone())
    }

    fn emit_position_update(&mut self) {
        self.pending_events.push(PlaybackEvent::PositionUpdate {
            position: self.current_time,
            duration: self.duration,
        });
    }

    fn emit_queue_changed(&mut self) {
        self.pending_events.push(PlaybackEvent::QueueChanged {
            length: self.queue.len(),
        });
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new(&PlaybackConfig::default())
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.release_session();
    }
}

/// Clamp a position to `[0, duration]`; NaN becomes 0
fn clamp_time(time: f64, duration: f64) -> f64 {
    if time.is_nan() {
        return 0.0;
    }
    time.clamp(0.0, duration.max(0.0))
}
