//! Fixed-value reading source for hosts without GPIO.

use super::ReadingSource;
use crate::error::SensorError;

pub const SIMULATED_TEMPERATURE: f32 = 20.0;
pub const SIMULATED_HUMIDITY: f32 = 50.0;

/// Always reports 20.0 °C and 50.0 % relative humidity.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedSource;

impl ReadingSource for SimulatedSource {
    fn temperature(&mut self) -> Result<Option<f32>, SensorError> {
        Ok(Some(SIMULATED_TEMPERATURE))
    }

    fn humidity(&mut self) -> Result<Option<f32>, SensorError> {
        Ok(Some(SIMULATED_HUMIDITY))
    }

    fn holds_resources(&self) -> bool {
        false
    }

    fn release(&mut self) {}
}
