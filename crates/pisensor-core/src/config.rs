//! Configuration loading and typed config structures.
//!
//! Both binaries read the same `pisensor-config.yaml`. Every section and
//! field has a default, so an empty or missing file yields a working
//! development setup (local `SQLite` file, simulated GPIO, two sensors).

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "pisensor-config.yaml";

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "PISENSOR_CONFIG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The parsed values are inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration shared by the agent and the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PiSensorConfig {
    /// Shared store settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// HTTP API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// On-device agent settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PiSensorConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `DATABASE_URL` overrides `database.url`
    /// - `PISENSOR_API_URL` overrides `agent.remote_url`
    /// - `PISENSOR_API_PORT` overrides `api.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if the values are inconsistent.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if the values are inconsistent.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_without_env(yaml)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if the values are inconsistent.
    pub fn parse_without_env(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from `PISENSOR_CONFIG`, else `pisensor-config.yaml` if it
    /// exists, else defaults. Env overrides apply in every case.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an existing file cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::from_file(Path::new(&path));
        }
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override selected values from the environment when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `PISENSOR_API_PORT` is not a port.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("PISENSOR_API_URL") {
            self.agent.remote_url = Some(val);
        }
        if let Ok(val) = std::env::var("PISENSOR_API_PORT") {
            self.api.port = val
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("PISENSOR_API_PORT={val:?}: {e}")))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeMap::new();
        for sensor in &self.agent.sensors {
            if sensor.id.trim().is_empty() {
                return Err(ConfigError::Invalid("sensor id must not be empty".to_owned()));
            }
            if let Some(other) = seen.insert(sensor.pin, sensor.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "pin {} is mapped to both {other} and {}",
                    sensor.pin, sensor.id
                )));
            }
        }
        if self.agent.sample_interval_ms == 0 || self.agent.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "agent sample and poll intervals must be non-zero".to_owned(),
            ));
        }
        if self.agent.remote_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "agent.remote_timeout_ms must be non-zero".to_owned(),
            ));
        }
        if self.agent.debounce_samples == 0 {
            return Err(ConfigError::Invalid(
                "agent.debounce_samples must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// Shared store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection acquire timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Connection acquire timeout.
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

/// HTTP API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    /// Bind address.
    #[serde(default = "default_api_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Sensor ids accepted by write endpoints. Empty accepts any id.
    #[serde(default)]
    pub known_sensors: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            known_sensors: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// On-device agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentConfig {
    /// Input lines and the sensors they report for.
    #[serde(default = "default_sensors")]
    pub sensors: Vec<SensorBinding>,

    /// How often input lines are sampled, in milliseconds.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    /// Consecutive samples a new level must hold before it is accepted.
    #[serde(default = "default_debounce_samples")]
    pub debounce_samples: u32,

    /// How often the remote status is re-read, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on a single remote status read, in milliseconds.
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,

    /// Base URL of the HTTP API. When unset the agent reads the shared
    /// store directly.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Adopt an `Error` written by someone else while locally `Online`.
    #[serde(default = "default_true")]
    pub follow_remote_errors: bool,

    /// GPIO backend selection.
    #[serde(default)]
    pub gpio: GpioConfig,

    /// RGB indicator wiring and colors.
    #[serde(default)]
    pub indicator: IndicatorConfig,

    /// Buzzer wiring.
    #[serde(default)]
    pub buzzer: BuzzerConfig,
}

impl AgentConfig {
    /// Input sampling period.
    pub const fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// Remote poll period.
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Remote read timeout.
    pub const fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    /// Distinct sensor ids in configuration order.
    pub fn sensor_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.sensors.len());
        for binding in &self.sensors {
            if !ids.contains(&binding.id) {
                ids.push(binding.id.clone());
            }
        }
        ids
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            sensors: default_sensors(),
            sample_interval_ms: default_sample_interval_ms(),
            debounce_samples: default_debounce_samples(),
            poll_interval_ms: default_poll_interval_ms(),
            remote_timeout_ms: default_remote_timeout_ms(),
            remote_url: None,
            follow_remote_errors: true,
            gpio: GpioConfig::default(),
            indicator: IndicatorConfig::default(),
            buzzer: BuzzerConfig::default(),
        }
    }
}

/// One input line wired to a sensor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SensorBinding {
    /// Logical sensor id.
    pub id: String,
    /// BCM pin number of the input line (pull-up, pressed = low).
    pub pin: u32,
}

/// Which GPIO implementation the agent drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpioBackend {
    /// In-memory lines for development without hardware.
    #[default]
    Simulated,
    /// Linux sysfs (`/sys/class/gpio`).
    Sysfs,
}

/// GPIO backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GpioConfig {
    /// Backend to use.
    #[serde(default)]
    pub backend: GpioBackend,

    /// Root of the sysfs GPIO tree.
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: String,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            backend: GpioBackend::default(),
            sysfs_root: default_sysfs_root(),
        }
    }
}

/// A color the RGB indicator can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RgbColor {
    /// Red channel only.
    Red,
    /// Green channel only.
    Green,
    /// Blue channel only.
    Blue,
    /// Red and green.
    Yellow,
    /// Red and blue.
    Purple,
    /// All channels dark.
    Off,
}

impl RgbColor {
    /// Channel levels as `(red, green, blue)`.
    pub const fn channels(self) -> (bool, bool, bool) {
        match self {
            Self::Red => (true, false, false),
            Self::Green => (false, true, false),
            Self::Blue => (false, false, true),
            Self::Yellow => (true, true, false),
            Self::Purple => (true, false, true),
            Self::Off => (false, false, false),
        }
    }
}

/// RGB indicator wiring and per-sensor error colors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndicatorConfig {
    /// BCM pin of the red channel.
    #[serde(default = "default_red_pin")]
    pub red_pin: u32,

    /// BCM pin of the green channel.
    #[serde(default = "default_green_pin")]
    pub green_pin: u32,

    /// BCM pin of the blue channel.
    #[serde(default = "default_blue_pin")]
    pub blue_pin: u32,

    /// Error color per sensor id.
    #[serde(default = "default_sensor_colors")]
    pub sensor_colors: BTreeMap<String, RgbColor>,

    /// Error color for sensors missing from `sensor_colors`.
    #[serde(default = "default_unknown_color")]
    pub unknown_color: RgbColor,

    /// Color when more than one sensor is faulted.
    #[serde(default = "default_multiple_color")]
    pub multiple_color: RgbColor,
}

impl IndicatorConfig {
    /// Error color for a sensor.
    pub fn color_for(&self, sensor_id: &str) -> RgbColor {
        self.sensor_colors
            .get(sensor_id)
            .copied()
            .unwrap_or(self.unknown_color)
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            red_pin: default_red_pin(),
            green_pin: default_green_pin(),
            blue_pin: default_blue_pin(),
            sensor_colors: default_sensor_colors(),
            unknown_color: default_unknown_color(),
            multiple_color: default_multiple_color(),
        }
    }
}

/// Active buzzer wiring.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuzzerConfig {
    /// Whether the ambient pattern is played at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// BCM pin driving the buzzer.
    #[serde(default = "default_buzzer_pin")]
    pub pin: u32,
}

impl Default for BuzzerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pin: default_buzzer_pin(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_database_url() -> String {
    "sqlite://pisensor.db".to_owned()
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_api_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_api_port() -> u16 {
    5000
}

fn default_sensors() -> Vec<SensorBinding> {
    vec![
        SensorBinding {
            id: "SENSOR-001".to_owned(),
            pin: 23,
        },
        SensorBinding {
            id: "SENSOR-002".to_owned(),
            pin: 24,
        },
    ]
}

const fn default_sample_interval_ms() -> u64 {
    20
}

const fn default_debounce_samples() -> u32 {
    2
}

const fn default_poll_interval_ms() -> u64 {
    2_000
}

const fn default_remote_timeout_ms() -> u64 {
    3_000
}

const fn default_true() -> bool {
    true
}

fn default_sysfs_root() -> String {
    "/sys/class/gpio".to_owned()
}

const fn default_red_pin() -> u32 {
    17
}

const fn default_green_pin() -> u32 {
    27
}

const fn default_blue_pin() -> u32 {
    22
}

fn default_sensor_colors() -> BTreeMap<String, RgbColor> {
    BTreeMap::from([
        ("SENSOR-001".to_owned(), RgbColor::Red),
        ("SENSOR-002".to_owned(), RgbColor::Blue),
    ])
}

const fn default_unknown_color() -> RgbColor {
    RgbColor::Yellow
}

const fn default_multiple_color() -> RgbColor {
    RgbColor::Purple
}

const fn default_buzzer_pin() -> u32 {
    18
}

fn default_log_level() -> String {
    "info".to_owned()
}
