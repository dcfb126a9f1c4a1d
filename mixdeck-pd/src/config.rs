//! Configuration for the Play Director
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments / environment variables (binary only)
//! 2. TOML configuration file (per room/session)
//! 3. Built-in defaults (code constants)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Play Director configuration for one playback device in a room.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectorConfig {
    /// Is this device the audio source (authority) for the room?
    #[serde(default)]
    pub is_playback_device: bool,

    /// Stable identity of this device inside the room
    #[serde(default = "default_device_id")]
    pub device_id: String,

    /// Identity of the acting DJ
    #[serde(default = "default_dj_id")]
    pub dj_id: String,

    /// Auto-crossfade duration near track end, seconds (0 = hard cut)
    #[serde(default = "default_crossfade_duration")]
    pub crossfade_duration: f64,

    /// Crossfade duration for manual skips, seconds (0 = hard cut)
    #[serde(default = "default_manual_skip_crossfade")]
    pub manual_skip_crossfade: f64,

    /// Follower drift-check interval, milliseconds
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,

    /// Authority position-broadcast interval, milliseconds
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,

    /// Maximum follower drift before a corrective seek, seconds
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: f64,

    /// Minimum gap between two drift corrections, milliseconds
    #[serde(default = "default_drift_cooldown_ms")]
    pub drift_cooldown_ms: u64,

    /// Start playback immediately after a load succeeds
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,

    /// Delay before retrying a recoverable load failure, milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_device_id() -> String {
    "HOST".to_string()
}

fn default_dj_id() -> String {
    "HOST".to_string()
}

fn default_crossfade_duration() -> f64 {
    10.0
}

fn default_manual_skip_crossfade() -> f64 {
    3.0
}

fn default_sync_interval_ms() -> u64 {
    2000
}

fn default_broadcast_interval_ms() -> u64 {
    1000
}

fn default_drift_threshold() -> f64 {
    3.0
}

fn default_drift_cooldown_ms() -> u64 {
    2000
}

fn default_autoplay() -> bool {
    true
}

fn default_retry_delay_ms() -> u64 {
    5000
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            is_playback_device: false,
            device_id: default_device_id(),
            dj_id: default_dj_id(),
            crossfade_duration: default_crossfade_duration(),
            manual_skip_crossfade: default_manual_skip_crossfade(),
            sync_interval_ms: default_sync_interval_ms(),
            broadcast_interval_ms: default_broadcast_interval_ms(),
            drift_threshold: default_drift_threshold(),
            drift_cooldown_ms: default_drift_cooldown_ms(),
            autoplay: default_autoplay(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl DirectorConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: DirectorConfig = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid config {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the transition engine and scheduler cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.crossfade_duration < 0.0 || self.manual_skip_crossfade < 0.0 {
            return Err(Error::Config(
                "crossfade durations must be non-negative".to_string(),
            ));
        }
        if self.broadcast_interval_ms == 0 || self.sync_interval_ms == 0 {
            return Err(Error::Config(
                "broadcast and sync intervals must be non-zero".to_string(),
            ));
        }
        if self.drift_threshold <= 0.0 {
            return Err(Error::Config(
                "drift threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
