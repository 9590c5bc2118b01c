//! Simulated audio backend
//!
//! Stands in for a real decoder/output: a session is a clock that advances
//! while playing and fires its end signal when it reaches the duration.

use crate::config::SimulationSettings;
use async_trait::async_trait;
use riff_playback::{
    AudioBackend, AudioSession, AudioSourceRef, EndSignal, LoadedSession, PlaybackError, Result,
    Track,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Backend that "decodes" the configured catalog
pub struct SimulatedBackend {
    durations: HashMap<String, f64>,
    failing: HashSet<String>,
    speed: f64,
    load_latency: Duration,
}

impl SimulatedBackend {
    pub fn new(settings: &SimulationSettings, tracks: &[Track]) -> Self {
        let durations = tracks
            .iter()
            .filter_map(|t| t.source().map(|s| (s.as_str().to_string(), t.duration)))
            .collect();

        Self {
            durations,
            failing: settings.failing_sources.iter().cloned().collect(),
            speed: settings.speed,
            load_latency: Duration::from_millis(settings.load_latency_ms),
        }
    }
}

#[async_trait]
impl AudioBackend for SimulatedBackend {
    async fn load(&self, source: &AudioSourceRef, on_end: EndSignal) -> Result<LoadedSession> {
        tokio::time::sleep(self.load_latency).await;

        if self.failing.contains(source.as_str()) {
            return Err(PlaybackError::audio_load(
                source.as_str(),
                "simulated decoder failure",
            ));
        }

        let duration = self
            .durations
            .get(source.as_str())
            .copied()
            .ok_or_else(|| PlaybackError::audio_load(source.as_str(), "unknown source"))?;

        debug!(source = %source, duration, "Simulated load complete");
        let session = SimulatedSession::new(duration, self.speed, on_end);
        Ok(LoadedSession::new(Box::new(session), duration))
    }
}

/// Clock-driven session
pub struct SimulatedSession {
    duration: f64,
    speed: f64,

    /// Position when the clock was last anchored
    offset: f64,

    /// Set while playing
    playing_since: Option<Instant>,

    volume: f64,
    end: Arc<Mutex<Option<EndSignal>>>,
    end_timer: Option<JoinHandle<()>>,
}

impl SimulatedSession {
    pub fn new(duration: f64, speed: f64, on_end: EndSignal) -> Self {
        Self {
            duration: duration.max(0.0),
            speed,
            offset: 0.0,
            playing_since: None,
            volume: 1.0,
            end: Arc::new(Mutex::new(Some(on_end))),
            end_timer: None,
        }
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    /// Freeze the clock at the current position
    fn halt(&mut self) {
        self.offset = self.position();
        self.playing_since = None;
        if let Some(timer) = self.end_timer.take() {
            timer.abort();
        }
    }

    /// Start the clock and schedule the end signal
    fn run(&mut self) {
        self.playing_since = Some(Instant::now());

        let remaining = (self.duration - self.offset).max(0.0) / self.speed;
        let wait = Duration::try_from_secs_f64(remaining).unwrap_or(Duration::ZERO);
        let end = Arc::clone(&self.end);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                self.end_timer = Some(handle.spawn(async move {
                    tokio::time::sleep(wait).await;
                    let signal = end.lock().ok().and_then(|mut slot| slot.take());
                    if let Some(signal) = signal {
                        signal.notify();
                    }
                }));
            }
            Err(_) => warn!("No runtime; simulated session will not report its end"),
        }
    }
}

impl AudioSession for SimulatedSession {
    fn play(&mut self) {
        if !self.is_playing() {
            self.run();
        }
    }

    fn pause(&mut self) {
        if self.is_playing() {
            self.halt();
        }
    }

    fn stop(&mut self) {
        self.halt();
        // A stopped session never reports an end
        if let Ok(mut slot) = self.end.lock() {
            slot.take();
        }
    }

    fn seek(&mut self, position: f64) {
        let was_playing = self.is_playing();
        self.halt();
        self.offset = position.clamp(0.0, self.duration);
        if was_playing {
            self.run();
        }
    }

    fn set_volume(&mut self, level: f64) {
        self.volume = level;
    }

    fn position(&self) -> f64 {
        match self.playing_since {
            Some(since) => {
                let elapsed = since.elapsed().as_secs_f64() * self.speed;
                (self.offset + elapsed).min(self.duration)
            }
            None => self.offset,
        }
    }
}

impl Drop for SimulatedSession {
    fn drop(&mut self) {
        if let Some(timer) = self.end_timer.take() {
            timer.abort();
        }
    }
}
