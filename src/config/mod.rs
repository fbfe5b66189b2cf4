//! Configuration module for the vitalvis engine
//!
//! A session is configured once, up front: which groups exist and which
//! series belong to them, how many rows the streaming buffer retains per
//! series, how often the drain tick runs, and how the window engine behaves
//! (trailing width in realtime mode, zoom debounce quiet period, minimum
//! zoom span). The engine treats all of this as immutable for the lifetime
//! of the session.
//!
//! Config files are TOML:
//!
//! ```toml
//! [[group]]
//! name = "hemodynamics"
//! members = ["hr", "abp", "spo2"]
//!
//! [stream]
//! max_rows_per_series = 100000
//! drain_interval_ms = 100
//!
//! [window]
//! trailing_ms = 30000
//! zoom_debounce_ms = 250
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vitalvis::config::EngineConfig;
//!
//! let config = EngineConfig::load_or_default(Some("session.toml".as_ref()));
//! for group in &config.groups {
//!     println!("{}: {} members", group.name, group.members.len());
//! }
//! ```

use crate::error::{Result, VitalVisError};
use crate::types::SeriesId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "vitalvis";

/// Default config filename
pub const CONFIG_FILE: &str = "engine.toml";

/// Default streaming buffer cap per series
pub const DEFAULT_MAX_ROWS_PER_SERIES: usize = 100_000;

/// Default drain cadence for streaming mode in milliseconds
pub const DEFAULT_DRAIN_INTERVAL_MS: u64 = 100;

/// Default trailing window width in realtime mode (30 seconds)
pub const DEFAULT_TRAILING_MS: i64 = 30_000;

/// Default quiet period before a wheel-zoom fires a re-fetch
pub const DEFAULT_ZOOM_DEBOUNCE_MS: u64 = 250;

/// Smallest window span a zoom may produce, in milliseconds
pub const MIN_ZOOM_SPAN_MS: i64 = 1;

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

/// A named set of series merged and rendered together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupConfig {
    /// Group name, unique within a config
    pub name: String,
    /// Member series ids, in column order
    pub members: Vec<SeriesId>,
}

/// Streaming buffer settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamConfig {
    /// Maximum retained rows per series; oldest rows are evicted first
    #[serde(default = "default_max_rows")]
    pub max_rows_per_series: usize,
    /// Cadence of the drain tick in streaming mode
    #[serde(default = "default_drain_interval")]
    pub drain_interval_ms: u64,
}

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS_PER_SERIES
}

fn default_drain_interval() -> u64 {
    DEFAULT_DRAIN_INTERVAL_MS
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_rows_per_series: DEFAULT_MAX_ROWS_PER_SERIES,
            drain_interval_ms: DEFAULT_DRAIN_INTERVAL_MS,
        }
    }
}

/// Window engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowConfig {
    /// Width of the trailing window in realtime mode
    #[serde(default = "default_trailing")]
    pub trailing_ms: i64,
    /// Quiet period before a coalesced wheel-zoom fires its re-fetch
    #[serde(default = "default_debounce")]
    pub zoom_debounce_ms: u64,
}

fn default_trailing() -> i64 {
    DEFAULT_TRAILING_MS
}

fn default_debounce() -> u64 {
    DEFAULT_ZOOM_DEBOUNCE_MS
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            trailing_ms: DEFAULT_TRAILING_MS,
            zoom_debounce_ms: DEFAULT_ZOOM_DEBOUNCE_MS,
        }
    }
}

/// Complete engine configuration for one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EngineConfig {
    /// Group definitions
    #[serde(default, rename = "group")]
    pub groups: Vec<GroupConfig>,
    /// Streaming buffer settings
    #[serde(default)]
    pub stream: StreamConfig,
    /// Window engine settings
    #[serde(default)]
    pub window: WindowConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VitalVisError::Config(format!("Failed to read {:?}: {}", path, e)))?;

        let config: EngineConfig = toml::from_str(&content)
            .map_err(|e| VitalVisError::Config(format!("Failed to parse {:?}: {}", path, e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or the default location if `None`, returning
    /// defaults on any error.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let resolved = path
            .map(|p| p.to_path_buf())
            .or_else(default_config_path);

        let Some(resolved) = resolved else {
            tracing::warn!("Could not determine config path, using defaults");
            return Self::default();
        };

        if !resolved.exists() {
            return Self::default();
        }

        Self::load(&resolved).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VitalVisError::Config(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| VitalVisError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| VitalVisError::Config(format!("Failed to write {:?}: {}", path, e)))
    }

    /// Check internal consistency of the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.stream.max_rows_per_series == 0 {
            return Err(VitalVisError::Config(
                "stream.max_rows_per_series must be at least 1".to_string(),
            ));
        }

        if self.window.trailing_ms < MIN_ZOOM_SPAN_MS {
            return Err(VitalVisError::Config(format!(
                "window.trailing_ms must be at least {}",
                MIN_ZOOM_SPAN_MS
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for group in &self.groups {
            if !seen.insert(group.name.as_str()) {
                return Err(VitalVisError::Config(format!(
                    "Duplicate group name '{}'",
                    group.name
                )));
            }
            if group.members.is_empty() {
                return Err(VitalVisError::Config(format!(
                    "Group '{}' has no members",
                    group.name
                )));
            }
        }

        Ok(())
    }

    /// Ids of every series referenced by any group, in first-seen order.
    pub fn all_series(&self) -> Vec<SeriesId> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for group in &self.groups {
            for id in &group.members {
                if seen.insert(id.clone()) {
                    out.push(id.clone());
                }
            }
        }
        out
    }

    /// Look up a group definition by name.
    pub fn group(&self, name: &str) -> Option<&GroupConfig> {
        self.groups.iter().find(|g| g.name == name)
    }
}
