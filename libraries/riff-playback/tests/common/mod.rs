//! Shared test infrastructure
//!
//! A scripted audio backend whose loads can be held open, failed, or
//! finished on demand, plus recording sessions the tests can inspect.

#![allow(dead_code)]

use async_trait::async_trait;
use riff_playback::{
    AudioBackend, AudioSession, AudioSourceRef, EndSignal, LoadedSession, PlaybackError,
    PlaybackSnapshot, Player, Result, Track,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

// ============================================================================
// Sessions
// ============================================================================

/// Command received by a mock session
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Play,
    Pause,
    Stop,
    Seek(f64),
    Volume(f64),
}

#[derive(Debug, Default)]
struct SessionState {
    calls: Vec<Call>,
    position: f64,
}

/// Session that records every command
struct MockSession {
    state: Arc<Mutex<SessionState>>,
}

impl AudioSession for MockSession {
    fn play(&mut self) {
        self.state.lock().unwrap().calls.push(Call::Play);
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().calls.push(Call::Pause);
    }

    fn stop(&mut self) {
        self.state.lock().unwrap().calls.push(Call::Stop);
    }

    fn seek(&mut self, position: f64) {
        let mut state = self.state.lock().unwrap();
        state.position = position;
        state.calls.push(Call::Seek(position));
    }

    fn set_volume(&mut self, level: f64) {
        self.state.lock().unwrap().calls.push(Call::Volume(level));
    }

    fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }
}

/// Test-side view of a mock session
#[derive(Clone)]
pub struct SessionProbe {
    pub source: String,
    state: Arc<Mutex<SessionState>>,
}

impl SessionProbe {
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn last(&self) -> Option<Call> {
        self.calls().last().cloned()
    }

    pub fn is_stopped(&self) -> bool {
        self.calls().contains(&Call::Stop)
    }

    pub fn is_playing(&self) -> bool {
        self.calls()
            .iter()
            .rev()
            .find(|c| matches!(c, Call::Play | Call::Pause | Call::Stop))
            == Some(&Call::Play)
    }

    /// Pretend the decoder advanced
    pub fn set_position(&self, position: f64) {
        self.state.lock().unwrap().position = position;
    }
}

/// Build a loaded session outside of any backend
pub fn loaded_session(source: &str, duration: f64) -> (LoadedSession, SessionProbe) {
    let state = Arc::new(Mutex::new(SessionState::default()));
    let probe = SessionProbe {
        source: source.to_string(),
        state: state.clone(),
    };
    (
        LoadedSession::new(Box::new(MockSession { state }), duration),
        probe,
    )
}

// ============================================================================
// Backend
// ============================================================================

#[derive(Default)]
struct BackendState {
    durations: HashMap<String, f64>,
    failing: HashSet<String>,
    gated: HashSet<String>,
    gates: Vec<(String, oneshot::Sender<()>)>,
    loads: Vec<String>,
    sessions: Vec<SessionProbe>,
    end_signals: Vec<(String, EndSignal)>,
}

/// Backend driven by the test
///
/// Loads resolve immediately unless their source is gated, in which case
/// they wait for [`ScriptedBackend::release`].
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<BackendState>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration reported when `source` loads (defaults to the track's)
    pub fn with_duration(self, source: &str, duration: f64) -> Self {
        self.state
            .lock()
            .unwrap()
            .durations
            .insert(source.to_string(), duration);
        self
    }

    /// Make loads of `source` fail
    pub fn failing(self, source: &str) -> Self {
        self.state.lock().unwrap().failing.insert(source.to_string());
        self
    }

    /// Hold loads of `source` until released
    pub fn gated(self, source: &str) -> Self {
        self.state.lock().unwrap().gated.insert(source.to_string());
        self
    }

    /// Let the oldest held load of `source` finish
    pub fn release(&self, source: &str) {
        let mut state = self.state.lock().unwrap();
        let index = state
            .gates
            .iter()
            .position(|(s, _)| s == source)
            .unwrap_or_else(|| panic!("no held load for {source}"));
        let (_, gate) = state.gates.remove(index);
        let _ = gate.send(());
    }

    /// Fire the end signal of the newest session for `source`
    pub fn finish(&self, source: &str) {
        let mut state = self.state.lock().unwrap();
        let index = state
            .end_signals
            .iter()
            .rposition(|(s, _)| s == source)
            .unwrap_or_else(|| panic!("no end signal for {source}"));
        let (_, signal) = state.end_signals.remove(index);
        signal.notify();
    }

    /// Sources in the order loads were requested
    pub fn loads(&self) -> Vec<String> {
        self.state.lock().unwrap().loads.clone()
    }

    /// Sessions in creation order
    pub fn sessions(&self) -> Vec<SessionProbe> {
        self.state.lock().unwrap().sessions.clone()
    }

    /// Newest session created for `source`
    pub fn session(&self, source: &str) -> SessionProbe {
        self.sessions()
            .into_iter()
            .rev()
            .find(|p| p.source == source)
            .unwrap_or_else(|| panic!("no session for {source}"))
    }

    /// Sessions not stopped yet
    pub fn live_sessions(&self) -> Vec<SessionProbe> {
        self.sessions()
            .into_iter()
            .filter(|p| !p.is_stopped())
            .collect()
    }

    /// Wait until at least `count` loads were requested
    pub async fn wait_for_loads(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.loads().len() < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("backend never saw the load");
    }
}

#[async_trait]
impl AudioBackend for ScriptedBackend {
    async fn load(&self, source: &AudioSourceRef, on_end: EndSignal) -> Result<LoadedSession> {
        let key = source.as_str().to_string();

        let gate = {
            let mut state = self.state.lock().unwrap();
            state.loads.push(key.clone());
            if state.gated.contains(&key) {
                let (tx, rx) = oneshot::channel();
                state.gates.push((key.clone(), tx));
                Some(rx)
            } else {
                None
            }
        };

        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let mut state = self.state.lock().unwrap();
        if state.failing.contains(&key) {
            return Err(PlaybackError::audio_load(&key, "unsupported format"));
        }

        let duration = state.durations.get(&key).copied().unwrap_or(0.0);
        let (loaded, probe) = loaded_session(&key, duration);
        state.sessions.push(probe);
        state.end_signals.push((key, on_end));
        Ok(loaded)
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn create_track(id: &str, duration: f64) -> Track {
    Track::playable(id, format!("Track {}", id), duration, format!("/music/{}.mp3", id))
}

pub fn source_of(id: &str) -> String {
    format!("/music/{}.mp3", id)
}

/// Wait for a published snapshot matching `predicate`
pub async fn wait_until<F>(player: &Player, predicate: F) -> PlaybackSnapshot
where
    F: Fn(&PlaybackSnapshot) -> bool,
{
    let mut rx = player.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| predicate(s)))
        .await
        .expect("timed out waiting for snapshot")
        .expect("player closed")
        .clone();
    snapshot
}

/// Wait until `condition` holds
pub async fn eventually<F>(condition: F)
where
    F: Fn() -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition never held");
}
