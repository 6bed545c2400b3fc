//! Detector configuration, loaded from a TOML file.
//!
//! The config file lives at `~/.config/tracehound/config.toml` by default;
//! a missing file yields the default configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Which clock the buffer eviction check runs against.
///
/// Eviction age and intra-pattern span are measured with the same threshold,
/// but the eviction reference clock is a deployment choice: a live tail of a
/// real-time trace wants wall-clock age, while replaying a backlog with
/// historical timestamps wants event-time age so that processing speed cannot
/// evict (or retain) entries spuriously.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionMode {
    /// Head age is measured against `Utc::now()` at ingestion time.
    #[default]
    WallClock,
    /// Head age is measured against the newest ingested event timestamp.
    EventTime,
}

/// Top-level Tracehound configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Window width in milliseconds, applied to both buffer eviction and the
    /// first-to-last matched element span. Must be positive.
    #[serde(default = "default_time_threshold_ms")]
    pub time_threshold_ms: i64,

    /// Eviction reference clock.
    #[serde(default)]
    pub eviction: EvictionMode,

    /// Whether the compiled-in pattern set is registered.
    #[serde(default = "default_true")]
    pub include_builtin_patterns: bool,

    /// Optional TOML file with additional `[[pattern]]` entries, evaluated
    /// after the built-ins.
    #[serde(default)]
    pub patterns_path: Option<PathBuf>,

    /// Default tracing filter, overridden by the `TRACEHOUND_LOG` env var.
    #[serde(default)]
    pub log_filter: Option<String>,
}

fn default_time_threshold_ms() -> i64 {
    2000
}

fn default_true() -> bool {
    true
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            time_threshold_ms: default_time_threshold_ms(),
            eviction: EvictionMode::default(),
            include_builtin_patterns: true,
            patterns_path: None,
            log_filter: None,
        }
    }
}

impl DetectorConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// If the file does not exist, returns the default configuration.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: DetectorConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.time_threshold_ms <= 0 {
            return Err(ConfigError::InvalidThreshold {
                millis: self.time_threshold_ms,
            });
        }
        Ok(())
    }
}
