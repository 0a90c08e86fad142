//! Reading sources for temperature/humidity samples.
//!
//! A source is either the hardware DHT driver or a fixed simulator used on
//! hosts without GPIO. Which one runs is decided once at startup by
//! [`Platform::detect`].

use crate::config::{PollerConfig, Settings};
use crate::error::{Result, SensorError};
use std::path::PathBuf;

pub mod dht;
#[cfg(target_os = "linux")]
pub mod gpio;
pub mod pins;
pub mod simulated;

pub use simulated::SimulatedSource;

/// One temperature/humidity sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
}

/// Produces temperature and humidity values on request.
///
/// Either query may come back empty when the sensor had nothing to report.
#[cfg_attr(test, mockall::automock)]
pub trait ReadingSource {
    fn temperature(&mut self) -> std::result::Result<Option<f32>, SensorError>;

    fn humidity(&mut self) -> std::result::Result<Option<f32>, SensorError>;

    /// Whether hardware is held that must be released at shutdown.
    fn holds_resources(&self) -> bool;

    /// Free hardware resources. Calling it again is a no-op.
    fn release(&mut self);
}

/// Where readings come from on this host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Gpio { chip: PathBuf },
    Simulated,
}

impl Platform {
    /// GPIO is used when running on Linux, the chip device exists and
    /// simulation has not been forced.
    pub fn detect(settings: &Settings) -> Self {
        if settings.simulate || !cfg!(target_os = "linux") || !settings.gpio_chip.exists() {
            Platform::Simulated
        } else {
            Platform::Gpio {
                chip: settings.gpio_chip.clone(),
            }
        }
    }

    pub fn has_gpio(&self) -> bool {
        matches!(self, Platform::Gpio { .. })
    }
}

/// Acquire the reading source for `platform`.
pub fn open_source(
    platform: &Platform,
    config: &PollerConfig,
    settings: &Settings,
) -> Result<Box<dyn ReadingSource>> {
    match platform {
        Platform::Simulated => {
            tracing::info!("Using simulated sensor readings.");
            Ok(Box::new(SimulatedSource))
        }
        Platform::Gpio { chip } => open_hardware(chip, config, settings),
    }
}

#[cfg(target_os = "linux")]
fn open_hardware(
    chip: &std::path::Path,
    config: &PollerConfig,
    settings: &Settings,
) -> Result<Box<dyn ReadingSource>> {
    let pin = config
        .pin
        .ok_or_else(|| anyhow::anyhow!("No GPIO pin configured for the sensor"))?;
    let sensor = gpio::open_sensor(chip, pin, settings.sensor_model)?;
    tracing::info!("Initialized {} sensor.", settings.sensor_model);

    Ok(Box::new(dht::DhtSource::new(
        sensor,
        settings.sensor_model,
        settings.min_read_interval(),
    )))
}

#[cfg(not(target_os = "linux"))]
fn open_hardware(
    _chip: &std::path::Path,
    _config: &PollerConfig,
    _settings: &Settings,
) -> Result<Box<dyn ReadingSource>> {
    Err(anyhow::anyhow!("GPIO access is only supported on Linux").into())
}
