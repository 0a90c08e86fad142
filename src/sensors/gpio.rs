//! GPIO character-device access for the DHT data line (Linux only).

use super::dht::{DhtSensor, SensorModel};
use super::pins::BcmPin;
use anyhow::{Context, Result};
use gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::{CdevPin, Delay};
use std::path::Path;

/// Label shown for the requested line in `gpioinfo`.
const CONSUMER: &str = "dht-poller";

pub type LinuxDhtSensor = DhtSensor<CdevPin, Delay>;

/// Request `pin` on `chip` as an open-drain output idling high.
///
/// With open-drain, driving the line high releases it, so the same handle
/// can issue the start signal and then sample the sensor's reply.
pub fn open_sensor(chip: &Path, pin: BcmPin, model: SensorModel) -> Result<LinuxDhtSensor> {
    let mut chip = Chip::new(chip)
        .with_context(|| format!("Failed to open GPIO chip {}", chip.display()))?;
    let line = chip
        .get_line(pin.line_offset())
        .with_context(|| format!("Failed to look up GPIO line for {}", pin))?;
    let handle = line
        .request(LineRequestFlags::OUTPUT | LineRequestFlags::OPEN_DRAIN, 1, CONSUMER)
        .with_context(|| format!("Failed to request {} (is it in use?)", pin))?;
    let cdev_pin = CdevPin::new(handle).context("Failed to wrap GPIO line handle")?;

    tracing::debug!("Requested {} from {:?}", pin, chip.path());
    Ok(DhtSensor::new(cdev_pin, Delay, model))
}
