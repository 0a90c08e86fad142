//! Custom error types for the dht-poller application.
//!
//! This module defines domain-specific error types using thiserror,
//! separating startup validation failures from sensor read failures so the
//! poll loop can decide which ones are worth retrying.

use thiserror::Error;

/// Errors raised while validating command-line arguments
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("Usage: {program} <polling_interval_sec> <gpio_pin_bcm_number>")]
    Usage { program: String },

    #[error("Invalid arguments: {0}")]
    Parse(String),

    #[error("Invalid polling interval '{0}' provided. Must be a number.")]
    NotANumber(String),

    #[error("Polling interval must be a positive number.")]
    NonPositive,

    #[error("Polling interval '{0}' is out of range.")]
    OutOfRange(String),

    #[error("Invalid GPIO pin '{0}' provided.")]
    UnsupportedPin(String),
}

/// Errors related to sensor operations
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("DHT sensor not found, check wiring")]
    NotFound,

    #[error("Timed out waiting for sensor handshake. Try again.")]
    Timeout,

    #[error("A full buffer was not returned ({bits} of 40 bits). Try again.")]
    ShortFrame { bits: usize },

    #[error("Checksum did not validate. Try again.")]
    Checksum,

    #[error("GPIO access failed: {0}")]
    Gpio(String),

    #[error("Sensor resources already released")]
    Released,
}

impl SensorError {
    /// Whether the driver expects this failure to clear up on the next poll.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SensorError::NotFound
                | SensorError::Timeout
                | SensorError::ShortFrame { .. }
                | SensorError::Checksum
        )
    }
}

/// Errors related to runtime settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load settings: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors related to service operations
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Signal handling error: {0}")]
    SignalError(String),

    #[error("Failed to write reading: {0}")]
    OutputError(#[from] std::io::Error),
}

/// Application-level errors that can wrap other error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Arguments(#[from] ArgumentError),

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Process exit status for an error that ends the program before polling.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Arguments(_) => 1,
            _ => 2,
        }
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(SensorError::NotFound.is_recoverable());
        assert!(SensorError::Timeout.is_recoverable());
        assert!(SensorError::ShortFrame { bits: 12 }.is_recoverable());
        assert!(SensorError::Checksum.is_recoverable());
        assert!(!SensorError::Gpio("line busy".to_string()).is_recoverable());
        assert!(!SensorError::Released.is_recoverable());
    }

    #[test]
    fn test_exit_codes() {
        let usage = AppError::from(ArgumentError::Usage {
            program: "dht-poller".to_string(),
        });
        assert_eq!(usage.exit_code(), 1);
        assert_eq!(AppError::from(ArgumentError::NonPositive).exit_code(), 1);
        assert_eq!(AppError::from(ArgumentError::OutOfRange("1e300".into())).exit_code(), 1);
        assert_eq!(AppError::from(SensorError::Gpio("x".into())).exit_code(), 2);
        assert_eq!(
            AppError::from(anyhow::anyhow!("chip missing")).exit_code(),
            2
        );
    }

    #[test]
    fn test_usage_message() {
        let err = ArgumentError::Usage {
            program: "dht-poller".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Usage: dht-poller <polling_interval_sec> <gpio_pin_bcm_number>"
        );
    }
}
