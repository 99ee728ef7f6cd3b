use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid duration '{0}': {1}")]
    Duration(String, String),
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub formation: FormationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        WebConfig {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Interval between processing passes, in humantime form ("30s", "2m").
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
}

fn default_poll_interval() -> String {
    "30s".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            poll_interval: default_poll_interval(),
        }
    }
}

impl PipelineConfig {
    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        humantime::parse_duration(self.poll_interval.trim())
            .map_err(|e| ConfigError::Duration(self.poll_interval.clone(), e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecoderConfig {
    /// Sample rate the device firmware is expected to log at. A decoded log
    /// whose header deviates far from this is processed anyway but flagged.
    #[serde(default = "default_sample_rate")]
    pub nominal_sample_rate_hz: f64,
}

fn default_sample_rate() -> f64 {
    4.0
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            nominal_sample_rate_hz: default_sample_rate(),
        }
    }
}

/// Descent-rate thresholds and dwell times for exit/deployment detection.
///
/// Terminal freefall runs around 50 m/s and canopy descent around 5 m/s, so
/// the defaults sit between the two regimes with margin on both sides.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_exit_rate")]
    pub exit_rate_ms: f64,
    #[serde(default = "default_canopy_rate")]
    pub canopy_rate_ms: f64,
    #[serde(default = "default_freefall_dwell")]
    pub freefall_dwell_sec: f64,
    #[serde(default = "default_canopy_dwell")]
    pub canopy_dwell_sec: f64,
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window_sec: f64,
}

fn default_exit_rate() -> f64 {
    25.0
}

fn default_canopy_rate() -> f64 {
    10.0
}

fn default_freefall_dwell() -> f64 {
    3.0
}

fn default_canopy_dwell() -> f64 {
    5.0
}

fn default_smoothing_window() -> f64 {
    2.0
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            exit_rate_ms: default_exit_rate(),
            canopy_rate_ms: default_canopy_rate(),
            freefall_dwell_sec: default_freefall_dwell(),
            canopy_dwell_sec: default_canopy_dwell(),
            smoothing_window_sec: default_smoothing_window(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormationConfig {
    /// Two exits further apart than this never share a formation.
    #[serde(default = "default_window")]
    pub window_sec: i64,
    /// User id that wins base selection whenever they are a group member,
    /// e.g. a camera flyer or load organizer.
    #[serde(default)]
    pub base_preference: Option<String>,
}

fn default_window() -> i64 {
    60
}

impl Default for FormationConfig {
    fn default() -> Self {
        FormationConfig {
            window_sec: default_window(),
            base_preference: None,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}
