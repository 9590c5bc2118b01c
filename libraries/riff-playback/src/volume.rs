//! Volume control
//!
//! Linear level in 0.0-1.0 with a mute flag that preserves the level.

/// Volume controller
///
/// Every write is clamped. NaN is treated as silence rather than poisoning
/// the stored level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume {
    /// Volume level (0.0-1.0)
    level: f64,

    /// Mute state (preserves volume level)
    muted: bool,
}

impl Volume {
    /// Create new volume controller
    pub fn new(level: f64) -> Self {
        Self {
            level: Self::clamp(level),
            muted: false,
        }
    }

    /// Set volume level, clamped to 0.0-1.0
    pub fn set_level(&mut self, level: f64) {
        self.level = Self::clamp(level);
    }

    /// Get current volume level
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Mute audio (preserves volume level)
    pub fn mute(&mut self) {
        self.muted = true;
    }

    /// Unmute audio (restores previous volume)
    pub fn unmute(&mut self) {
        self.muted = false;
    }

    /// Toggle mute state
    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Level to hand to the audio session
    ///
    /// Returns 0.0 if muted, otherwise the stored level
    pub fn output_level(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.level
        }
    }

    fn clamp(level: f64) -> f64 {
        if level.is_nan() {
            0.0
        } else {
            level.clamp(0.0, 1.0)
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(0.8)
    }
}
