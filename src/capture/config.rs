//! View-finder configuration.
//!
//! Loaded from a TOML file; every section falls back to its defaults so a
//! partial file is valid.

use super::{CameraType, CaptureMode, FlashMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Camera selection and live settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CameraConfig {
    pub camera_type: CameraType,
    pub capture_mode: CaptureMode,
    pub flash_mode: FlashMode,
    pub torch: bool,
}

/// Barcode scanning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Decode preview frames at all.
    pub enabled: bool,
    /// Lowercase symbology names (`"qr"`, `"ean13"`, ...). Unknown names are ignored.
    pub symbologies: Vec<String>,
    /// Decode worker threads.
    pub workers: usize,
    /// Device orientation code (0 = natural portrait).
    pub orientation: i32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            symbologies: vec!["qr".to_string()],
            workers: 2,
            orientation: 0,
        }
    }
}

/// Live stream ingestion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub enabled: bool,
    pub stream_name: String,
    /// Directory the credentials properties file is written to.
    pub credentials_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub bitrate_bps: u32,
    pub retention_hours: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            stream_name: "test-video-stream".to_string(),
            credentials_dir: std::env::temp_dir(),
            width: 320,
            height: 240,
            frame_rate: 20,
            bitrate_bps: 384 * 1024,
            retention_hours: 2 * 24,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Run until interrupted (true) or process a fixed number of frames (false).
    pub continuous: bool,
    /// Number of frames to feed if not continuous.
    pub frame_count: u32,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            continuous: false,
            frame_count: 100,
            metrics_port: 9090,
        }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("scanner needs at least one decode worker")]
    NoWorkers,
    #[error("invalid stream dimensions")]
    InvalidStreamDimensions,
    #[error("invalid stream frame rate")]
    InvalidFrameRate,
    #[error("stream name must not be empty")]
    EmptyStreamName,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scanner.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.stream.width == 0 || self.stream.height == 0 {
            return Err(ConfigError::InvalidStreamDimensions);
        }
        if self.stream.frame_rate == 0 {
            return Err(ConfigError::InvalidFrameRate);
        }
        if self.stream.stream_name.trim().is_empty() {
            return Err(ConfigError::EmptyStreamName);
        }
        Ok(())
    }
}
