//! Audio backend contract
//!
//! The engine never decodes audio. It asks an [`AudioBackend`] to load a
//! source and drives the resulting [`AudioSession`] with fire-and-forget
//! transport commands.

use crate::error::Result;
use crate::types::{AudioSourceRef, SessionGeneration, TrackId};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// One loaded audio source
///
/// Commands never fail from the engine's point of view; a backend that
/// hits trouble mid-playback should report end-of-track.
pub trait AudioSession: Send {
    /// Start or resume output
    fn play(&mut self);

    /// Pause output, keeping position
    fn pause(&mut self);

    /// Stop output and release resources
    ///
    /// The engine calls this before dropping a session.
    fn stop(&mut self);

    /// Seek to a position in seconds
    fn seek(&mut self, position: f64);

    /// Set output level (0.0-1.0)
    fn set_volume(&mut self, level: f64);

    /// Current position in seconds
    fn position(&self) -> f64;
}

/// Successful load result
pub struct LoadedSession {
    pub session: Box<dyn AudioSession>,

    /// Duration reported by the decoder, in seconds
    pub duration: f64,
}

impl LoadedSession {
    pub fn new(session: Box<dyn AudioSession>, duration: f64) -> Self {
        Self { session, duration }
    }
}

impl std::fmt::Debug for LoadedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedSession")
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

/// Platform audio backend
///
/// Implementors must report the end of a playthrough through the supplied
/// [`EndSignal`]; it can only be fired once.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Load a source and prepare it for playback (not yet playing)
    async fn load(&self, source: &AudioSourceRef, on_end: EndSignal) -> Result<LoadedSession>;
}

/// One-shot end-of-track notification bound to a session generation
#[derive(Debug)]
pub struct EndSignal {
    generation: SessionGeneration,
    tx: mpsc::UnboundedSender<SessionGeneration>,
}

impl EndSignal {
    pub fn new(
        generation: SessionGeneration,
        tx: mpsc::UnboundedSender<SessionGeneration>,
    ) -> Self {
        Self { generation, tx }
    }

    /// Generation the signal was issued for
    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }

    /// Report that the session finished playing
    ///
    /// Consumes the signal. Silently does nothing if the player is gone.
    pub fn notify(self) {
        let _ = self.tx.send(self.generation);
    }
}

/// A load the engine wants performed
///
/// Produced by every transition that selects a playable track. Whoever
/// drives the engine runs the load and hands the result back, tagged with
/// the same generation, via [`crate::PlaybackEngine::complete_load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub generation: SessionGeneration,
    pub track_id: TrackId,
    pub source: AudioSourceRef,
}

/// Result of a load, tagged with the generation it was issued for
#[derive(Debug)]
pub struct LoadCompletion {
    pub generation: SessionGeneration,
    pub result: Result<LoadedSession>,
}
