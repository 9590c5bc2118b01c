/// CLI configuration
use crate::error::{CliError, Result};
use riff_playback::{PlaybackConfig, Track};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "riff.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub simulation: SimulationSettings,

    #[serde(default)]
    pub tracks: Vec<TrackEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// Playback clock multiplier (2.0 plays a 10s track in 5s)
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Simulated decoder open time
    #[serde(default = "default_load_latency_ms")]
    pub load_latency_ms: u64,

    /// Sources that fail to load
    #[serde(default)]
    pub failing_sources: Vec<String>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            load_latency_ms: default_load_latency_ms(),
            failing_sources: Vec::new(),
        }
    }
}

/// One `[[tracks]]` entry
///
/// Entries without a `source` are metadata-only.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackEntry {
    pub id: String,
    pub title: String,

    #[serde(default)]
    pub artist: String,

    #[serde(default)]
    pub album: String,

    #[serde(default)]
    pub cover_art: String,

    /// Seconds
    #[serde(default)]
    pub duration: f64,

    #[serde(default)]
    pub explicit: bool,

    #[serde(default)]
    pub source: Option<String>,
}

impl TrackEntry {
    pub fn to_track(&self) -> Track {
        let track = match &self.source {
            Some(source) => Track::playable(&self.id, &self.title, self.duration, source),
            None => Track::metadata_only(&self.id, &self.title, self.duration),
        };

        let mut track = track.by(&self.artist, &self.album);
        track.cover_art = self.cover_art.clone();
        track.explicit = self.explicit;
        track
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// `path` must exist when given; the default file is optional.
    /// Environment variables use the `RIFF_` prefix with `__` between
    /// sections, e.g. `RIFF_PLAYBACK__VOLUME=0.5`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (prefixed with RIFF_)
        settings = settings.add_source(
            config::Environment::with_prefix("RIFF")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.playback.validate()?;

        if !(self.simulation.speed.is_finite() && self.simulation.speed > 0.0) {
            return Err(CliError::Config(format!(
                "simulation.speed must be positive, got {}",
                self.simulation.speed
            )));
        }

        if self.tracks.is_empty() {
            return Err(CliError::Config(
                "No tracks configured (add [[tracks]] entries)".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.tracks {
            if !seen.insert(entry.id.as_str()) {
                return Err(CliError::Config(format!("Duplicate track id: {}", entry.id)));
            }
            if !(entry.duration.is_finite() && entry.duration >= 0.0) {
                return Err(CliError::Config(format!(
                    "Track {} has invalid duration {}",
                    entry.id, entry.duration
                )));
            }
        }

        Ok(())
    }

    /// Tracks in configured order
    pub fn queue_tracks(&self) -> Vec<Track> {
        self.tracks.iter().map(TrackEntry::to_track).collect()
    }
}

// Default values
fn default_speed() -> f64 {
    1.0
}

fn default_load_latency_ms() -> u64 {
    150
}
