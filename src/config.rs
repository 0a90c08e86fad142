//! Application configuration management.
//!
//! Two layers: the polling configuration taken from the command line, and
//! runtime settings read from `DHT_POLLER_*` environment variables. There is
//! no configuration file.

use crate::cli::Positional;
use crate::error::{ArgumentError, ConfigError};
use crate::sensors::Platform;
use crate::sensors::dht::SensorModel;
use crate::sensors::pins::BcmPin;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "DHT_POLLER";

/// Polling parameters fixed for the lifetime of the process
#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    pub interval: Duration,
    /// `None` when GPIO is unavailable and the pin argument was ignored.
    pub pin: Option<BcmPin>,
}

impl PollerConfig {
    /// Validate the positional arguments against the detected platform.
    pub fn from_args(args: &Positional<'_>, platform: &Platform) -> Result<Self, ArgumentError> {
        let interval = parse_interval(args.interval)?;
        let pin = if platform.has_gpio() {
            Some(args.pin.parse::<BcmPin>()?)
        } else {
            None
        };
        Ok(Self { interval, pin })
    }
}

/// Parse a polling interval in seconds.
///
/// The value must fit in a `Duration` and must not round down to zero.
pub fn parse_interval(s: &str) -> Result<Duration, ArgumentError> {
    let seconds: f64 = s
        .parse()
        .map_err(|_| ArgumentError::NotANumber(s.to_string()))?;
    if !seconds.is_finite() {
        return Err(ArgumentError::NotANumber(s.to_string()));
    }
    if seconds <= 0.0 {
        return Err(ArgumentError::NonPositive);
    }
    let interval = Duration::try_from_secs_f64(seconds)
        .map_err(|_| ArgumentError::OutOfRange(s.to_string()))?;
    if interval.is_zero() {
        return Err(ArgumentError::OutOfRange(s.to_string()));
    }
    Ok(interval)
}

/// Output format for diagnostic logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `Log: ...` / `Error: ...` lines
    #[default]
    Plain,
    /// One JSON object per event
    Json,
}

/// Runtime settings from the environment
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub simulate: bool,
    #[serde(default = "default_gpio_chip")]
    pub gpio_chip: PathBuf,
    #[serde(default)]
    pub sensor_model: SensorModel,
    #[serde(default = "default_min_read_interval")]
    pub min_read_interval_ms: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_gpio_chip() -> PathBuf {
    PathBuf::from("/dev/gpiochip0")
}

fn default_min_read_interval() -> u64 {
    2000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            simulate: false,
            gpio_chip: default_gpio_chip(),
            sensor_model: SensorModel::default(),
            min_read_interval_ms: default_min_read_interval(),
        }
    }
}

impl Settings {
    /// Load settings from `DHT_POLLER_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_source(environment: config::Environment) -> Result<Self, ConfigError> {
        let settings: Settings = config::Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "log_level".to_string(),
                message: "cannot be empty".to_string(),
            });
        }

        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.log_level) {
            return Err(ConfigError::InvalidValue {
                field: "log_level".to_string(),
                message: format!("'{}' is not a valid filter: {}", self.log_level, e),
            });
        }

        if self.min_read_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "min_read_interval_ms".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    pub fn min_read_interval(&self) -> Duration {
        Duration::from_millis(self.min_read_interval_ms)
    }
}
