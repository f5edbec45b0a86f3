//! Configuration module for motionlog
//!
//! This module handles application configuration including:
//! - The device to discover and its characteristic assignment
//! - Collection duration, queue sizing and latch policy
//! - Output location and format
//!
//! # Config Location
//!
//! The default config file lives in the platform-appropriate config
//! directory under `dev.motionlog.motionlog-rs`:
//!
//! - **Linux**: `~/.config/dev.motionlog.motionlog-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.motionlog.motionlog-rs/config.toml`
//! - **Windows**: `%APPDATA%\dev.motionlog.motionlog-rs\config.toml`
//!
//! Every section is optional; missing values fall back to defaults that
//! match the reference firmware (`Nano33IoT_Motion`, characteristics
//! `2A60`/`2A57`/`2A58`/`2A59`, 50 second sessions).
//!
//! # Example
//!
//! ```ignore
//! use motionlog::config::{AppConfig, SessionSettings};
//!
//! let config = AppConfig::load_or_default(default_config_path().unwrap());
//! let settings = SessionSettings::from_config(&config)?;
//! ```

pub mod settings;

pub use settings::*;

use crate::backend::router::{parse_channel_id, ChannelMap};
use crate::error::{MotionLogError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.motionlog.motionlog-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Name the reference firmware advertises under
pub const DEFAULT_DEVICE_NAME: &str = "Nano33IoT_Motion";

/// Default discovery timeout in milliseconds
pub const DEFAULT_DISCOVERY_TIMEOUT_MS: u64 = 10_000;

/// Default collection duration in seconds
pub const DEFAULT_DURATION_SECS: u64 = 50;

/// Default notification queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Default interval at which the worker re-checks its stop flag
pub const DEFAULT_STOP_POLL_INTERVAL_MS: u64 = 50;

// ==================== Config Directory ====================

/// Get the application config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== Device Config ====================

/// Which device to collect from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Advertised name to discover
    #[serde(default = "default_device_name")]
    pub name: String,

    /// How long discovery may take
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,
}

fn default_device_name() -> String {
    DEFAULT_DEVICE_NAME.to_string()
}

fn default_discovery_timeout_ms() -> u64 {
    DEFAULT_DISCOVERY_TIMEOUT_MS
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            discovery_timeout_ms: DEFAULT_DISCOVERY_TIMEOUT_MS,
        }
    }
}

// ==================== Channel Config ====================

/// Characteristic identifiers, short (`"2A60"`) or full UUID form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Clock characteristic
    #[serde(default = "default_timestamp_id")]
    pub timestamp: String,
    /// X axis characteristic
    #[serde(default = "default_acc_x_id")]
    pub acc_x: String,
    /// Y axis characteristic
    #[serde(default = "default_acc_y_id")]
    pub acc_y: String,
    /// Z axis characteristic
    #[serde(default = "default_acc_z_id")]
    pub acc_z: String,
}

fn default_timestamp_id() -> String {
    "2A60".to_string()
}

fn default_acc_x_id() -> String {
    "2A57".to_string()
}

fn default_acc_y_id() -> String {
    "2A58".to_string()
}

fn default_acc_z_id() -> String {
    "2A59".to_string()
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            timestamp: default_timestamp_id(),
            acc_x: default_acc_x_id(),
            acc_y: default_acc_y_id(),
            acc_z: default_acc_z_id(),
        }
    }
}

impl ChannelConfig {
    /// Parse every identifier and reject duplicates
    pub fn resolve(&self) -> Result<ChannelMap> {
        let map = ChannelMap {
            timestamp: parse_channel_id(&self.timestamp)?,
            acc_x: parse_channel_id(&self.acc_x)?,
            acc_y: parse_channel_id(&self.acc_y)?,
            acc_z: parse_channel_id(&self.acc_z)?,
        };

        let entries = map.entries();
        for (i, (ch_a, id_a)) in entries.iter().enumerate() {
            for (ch_b, id_b) in &entries[i + 1..] {
                if id_a == id_b {
                    return Err(MotionLogError::Config(format!(
                        "{} and {} channels share characteristic {}",
                        ch_a, ch_b, id_a
                    )));
                }
            }
        }

        Ok(map)
    }
}

// ==================== Collection Config ====================

/// Session timing and queue sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// How long to collect before stopping
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,

    /// Capacity of the notification queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How often the worker re-checks its stop flag
    #[serde(default = "default_stop_poll_interval_ms")]
    pub stop_poll_interval_ms: u64,

    /// Discard partial samples older than this (strict latch policy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completeness_deadline_ms: Option<u64>,
}

fn default_duration_secs() -> u64 {
    DEFAULT_DURATION_SECS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_stop_poll_interval_ms() -> u64 {
    DEFAULT_STOP_POLL_INTERVAL_MS
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            stop_poll_interval_ms: DEFAULT_STOP_POLL_INTERVAL_MS,
            completeness_deadline_ms: None,
        }
    }
}

// ==================== Output Config ====================

/// Format for persisted records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceFormat {
    /// CSV format - human readable, easy to import into spreadsheets
    #[default]
    Csv,
    /// JSON Lines format - one JSON object per line
    JsonLines,
}

impl PersistenceFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            PersistenceFormat::Csv => "csv",
            PersistenceFormat::JsonLines => "jsonl",
        }
    }
}

impl std::fmt::Display for PersistenceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceFormat::Csv => write!(f, "CSV"),
            PersistenceFormat::JsonLines => write!(f, "JSON Lines"),
        }
    }
}

/// Where and how records are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for output files
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Output file name; generated from the start time when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// Output format
    #[serde(default)]
    pub format: PersistenceFormat,

    /// Whether to write a `.meta.json` sidecar next to the output
    #[serde(default)]
    pub write_metadata: bool,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(".")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            file_name: None,
            format: PersistenceFormat::Csv,
            write_metadata: false,
        }
    }
}

impl OutputConfig {
    /// Output path for a session started at `started_at`
    pub fn resolve_path(&self, started_at: chrono::DateTime<chrono::Local>) -> PathBuf {
        let file_name = self.file_name.clone().unwrap_or_else(|| {
            format!(
                "motion_data_{}.{}",
                started_at.format("%Y%m%d_%H%M%S"),
                self.format.extension()
            )
        });
        self.directory.join(file_name)
    }
}

// ==================== App Config ====================

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Device selection
    #[serde(default)]
    pub device: DeviceConfig,

    /// Characteristic assignment
    #[serde(default)]
    pub channels: ChannelConfig,

    /// Collection settings
    #[serde(default)]
    pub collection: CollectionConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MotionLogError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            MotionLogError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load a config file, returning defaults if it is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MotionLogError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| MotionLogError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            MotionLogError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}

// ==================== Tests ====================
