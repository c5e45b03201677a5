//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section is optional; a missing file means all defaults.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::controller::profile::ControllerModel;
use crate::drone::VideoBitRate;
use crate::error::{Result, TelloPadError};

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "tellopad.toml";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub drone: DroneConfig,
    pub controller: ControllerConfig,
    pub video: VideoConfig,
    pub tracking: TrackingConfig,
    pub telemetry: TelemetryConfig,
}

/// Drone link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DroneConfig {
    #[serde(default = "default_drone_address")]
    pub address: String,

    #[serde(default = "default_local_port")]
    pub local_port: u16,

    #[serde(default = "default_state_port")]
    pub state_port: u16,

    #[serde(default = "default_video_port")]
    pub video_port: u16,

    #[serde(default = "default_connect_retry_ms")]
    pub connect_retry_ms: u64,
}

/// Controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    #[serde(default = "default_controller_model")]
    pub model: String,

    /// Empty means auto-detect by vendor/product id
    #[serde(default)]
    pub device_path: String,

    #[serde(default = "default_axis_min")]
    pub axis_min: i32,

    #[serde(default = "default_axis_max")]
    pub axis_max: i32,
}

/// Video pipeline configuration
#[derive(Debug, Deserialize, Clone)]
pub struct VideoConfig {
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,

    /// `"auto"` or a fixed rate in Mbps; unset means the binary's own default
    #[serde(default)]
    pub encoder_rate: Option<String>,

    /// Unset means the binary's own default
    #[serde(default)]
    pub exposure: Option<i8>,

    #[serde(default = "default_player")]
    pub player: Vec<String>,
}

/// Vision tracking configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,

    #[serde(default = "default_frame_height")]
    pub frame_height: u32,

    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    #[serde(default = "default_yaw_speed")]
    pub yaw_speed: u8,

    #[serde(default = "default_altitude_speed")]
    pub altitude_speed: u8,

    #[serde(default = "default_input_width")]
    pub input_width: u32,

    #[serde(default = "default_input_height")]
    pub input_height: u32,

    #[serde(default = "default_read_retry_ms")]
    pub read_retry_ms: u64,

    #[serde(default = "default_decoder")]
    pub decoder: String,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,
}

// Default value functions
fn default_drone_address() -> String { "192.168.10.1:8889".to_string() }
fn default_local_port() -> u16 { 8889 }
fn default_state_port() -> u16 { 8890 }
fn default_video_port() -> u16 { 11111 }
fn default_connect_retry_ms() -> u64 { 500 }

fn default_controller_model() -> String { "dualshock4".to_string() }
fn default_axis_min() -> i32 { 0 }
fn default_axis_max() -> i32 { 255 }

fn default_heartbeat_ms() -> u64 { 100 }
fn default_player() -> Vec<String> {
    ["mplayer", "-fps", "60", "-"].iter().map(|s| s.to_string()).collect()
}

fn default_frame_width() -> u32 { 360 }
fn default_frame_height() -> u32 { 240 }
fn default_confidence_threshold() -> f32 { 0.5 }
fn default_yaw_speed() -> u8 { 50 }
fn default_altitude_speed() -> u8 { 25 }
fn default_input_width() -> u32 { 128 }
fn default_input_height() -> u32 { 96 }
fn default_read_retry_ms() -> u64 { 10 }
fn default_decoder() -> String { "ffmpeg".to_string() }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 1000 }

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            address: default_drone_address(),
            local_port: default_local_port(),
            state_port: default_state_port(),
            video_port: default_video_port(),
            connect_retry_ms: default_connect_retry_ms(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            model: default_controller_model(),
            device_path: String::new(),
            axis_min: default_axis_min(),
            axis_max: default_axis_max(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            heartbeat_ms: default_heartbeat_ms(),
            encoder_rate: None,
            exposure: None,
            player: default_player(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            confidence_threshold: default_confidence_threshold(),
            yaw_speed: default_yaw_speed(),
            altitude_speed: default_altitude_speed(),
            input_width: default_input_width(),
            input_height: default_input_height(),
            read_retry_ms: default_read_retry_ms(),
            decoder: default_decoder(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> TelloPadError {
    TelloPadError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tellopad::config::Config;
    ///
    /// let config = Config::load("tellopad.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path` if it exists, otherwise use defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            Self::load(path)
        } else {
            info!("No {} found, using default configuration", path.display());
            Ok(Self::default())
        }
    }

    /// Parsed encoder rate, if one is configured
    pub fn encoder_rate(&self) -> Result<Option<VideoBitRate>> {
        self.video
            .encoder_rate
            .as_deref()
            .map(|s| s.parse::<VideoBitRate>().map_err(invalid))
            .transpose()
    }

    /// Parsed controller model
    pub fn controller_model(&self) -> Result<ControllerModel> {
        self.controller.model.parse::<ControllerModel>().map_err(invalid)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.drone.address.is_empty() {
            return Err(invalid("drone address cannot be empty"));
        }

        if self.drone.connect_retry_ms == 0 || self.drone.connect_retry_ms > 60000 {
            return Err(invalid("connect_retry_ms must be between 1 and 60000"));
        }

        self.controller_model()?;

        if self.controller.axis_min >= self.controller.axis_max {
            return Err(invalid("axis_min must be less than axis_max"));
        }

        if self.video.heartbeat_ms == 0 || self.video.heartbeat_ms > 10000 {
            return Err(invalid("heartbeat_ms must be between 1 and 10000"));
        }

        self.encoder_rate()?;

        if let Some(exposure) = self.video.exposure {
            if !(-9..=9).contains(&exposure) {
                return Err(invalid("exposure must be between -9 and 9"));
            }
        }

        if self.video.player.is_empty() || self.video.player[0].is_empty() {
            return Err(invalid("player command cannot be empty"));
        }

        let tracking = &self.tracking;
        if tracking.frame_width == 0 || tracking.frame_height == 0 {
            return Err(invalid("frame_width and frame_height must be greater than 0"));
        }

        if tracking.input_width == 0 || tracking.input_height == 0 {
            return Err(invalid("input_width and input_height must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&tracking.confidence_threshold) {
            return Err(invalid("confidence_threshold must be between 0.0 and 1.0"));
        }

        for (name, value) in [
            ("yaw_speed", tracking.yaw_speed),
            ("altitude_speed", tracking.altitude_speed),
        ] {
            if value > 100 {
                return Err(invalid(format!("{} must be between 0 and 100", name)));
            }
        }

        if tracking.read_retry_ms > 10000 {
            return Err(invalid("read_retry_ms must be at most 10000"));
        }

        if tracking.decoder.is_empty() {
            return Err(invalid("decoder program cannot be empty"));
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }
}
