//! Single-wire DHT11/DHT22 (AM2302) driver.
//!
//! The host pulls the data line low to request a measurement, then releases
//! it. The sensor answers with an 80 µs low / 80 µs high preamble followed by
//! 40 bits, each a ~50 µs low followed by a high pulse whose length encodes
//! the bit (~27 µs for 0, ~70 µs for 1). The line must be wired open-drain
//! with a pull-up, so releasing it (`set_high`) lets the sensor drive it.

use super::{Reading, ReadingSource};
use crate::error::SensorError;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Time allowed for the sensor to start answering the start signal.
const RESPONSE_TIMEOUT_US: u32 = 250;
/// Upper bound on each preamble half.
const HANDSHAKE_TIMEOUT_US: u32 = 200;
/// Upper bound on each half of a data bit.
const BIT_TIMEOUT_US: u32 = 200;
/// High pulses longer than this are a `1`.
const BIT_THRESHOLD_US: u32 = 48;

const FRAME_BITS: usize = 40;

/// Supported sensor variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorModel {
    Dht11,
    #[default]
    Dht22,
}

impl SensorModel {
    /// Length of the host's start signal
    fn start_pulse_us(self) -> u32 {
        match self {
            SensorModel::Dht11 => 18_000,
            SensorModel::Dht22 => 1_100,
        }
    }
}

impl fmt::Display for SensorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorModel::Dht11 => f.write_str("DHT11"),
            SensorModel::Dht22 => f.write_str("DHT22"),
        }
    }
}

/// Something that can perform one raw DHT transaction.
pub trait FrameReader {
    /// Run one transaction and return the five raw bytes.
    fn read_frame(&mut self) -> Result<[u8; 5], SensorError>;

    /// Give the data line back to the system.
    fn release(&mut self);

    fn is_released(&self) -> bool;
}

/// Bit-banged DHT transaction over an embedded-hal open-drain pin.
pub struct DhtSensor<P, D> {
    pin: Option<P>,
    delay: D,
    model: SensorModel,
}

impl<P, D> DhtSensor<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D, model: SensorModel) -> Self {
        Self {
            pin: Some(pin),
            delay,
            model,
        }
    }
}

fn gpio_error<E: fmt::Debug>(e: E) -> SensorError {
    SensorError::Gpio(format!("{:?}", e))
}

/// Busy-wait while the line stays at `level`.
///
/// Returns how long the level was held in microseconds, or `None` if it was
/// still held after `timeout_us`.
fn hold_time<P: InputPin>(pin: &mut P, level: bool, timeout_us: u32) -> Result<Option<u32>, SensorError> {
    let start = Instant::now();
    let timeout = Duration::from_micros(u64::from(timeout_us));
    loop {
        if pin.is_high().map_err(gpio_error)? != level {
            return Ok(Some(start.elapsed().as_micros() as u32));
        }
        if start.elapsed() > timeout {
            return Ok(None);
        }
    }
}

impl<P, D> FrameReader for DhtSensor<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        let Self { pin, delay, model } = self;
        let pin = pin.as_mut().ok_or(SensorError::Released)?;

        pin.set_low().map_err(gpio_error)?;
        delay.delay_us(model.start_pulse_us());
        pin.set_high().map_err(gpio_error)?;

        hold_time(pin, true, RESPONSE_TIMEOUT_US)?.ok_or(SensorError::NotFound)?;
        hold_time(pin, false, HANDSHAKE_TIMEOUT_US)?.ok_or(SensorError::Timeout)?;
        hold_time(pin, true, HANDSHAKE_TIMEOUT_US)?.ok_or(SensorError::Timeout)?;

        let mut highs = [0u32; FRAME_BITS];
        for (bits, slot) in highs.iter_mut().enumerate() {
            hold_time(pin, false, BIT_TIMEOUT_US)?.ok_or(SensorError::ShortFrame { bits })?;
            *slot = hold_time(pin, true, BIT_TIMEOUT_US)?.ok_or(SensorError::ShortFrame { bits })?;
        }

        Ok(frame_from_pulses(&highs))
    }

    fn release(&mut self) {
        // Dropping the pin closes the line handle.
        self.pin.take();
    }

    fn is_released(&self) -> bool {
        self.pin.is_none()
    }
}

/// Pack 40 high-pulse widths (µs) into bytes, MSB first.
pub fn frame_from_pulses(highs: &[u32; FRAME_BITS]) -> [u8; 5] {
    let mut frame = [0u8; 5];
    for (i, &width) in highs.iter().enumerate() {
        if width > BIT_THRESHOLD_US {
            frame[i / 8] |= 0x80 >> (i % 8);
        }
    }
    frame
}

/// Decode a raw frame.
///
/// A frame that passes the checksum but carries no data (all zeros, which is
/// what a stuck-low line produces) or an out-of-range humidity yields `None`.
pub fn decode(model: SensorModel, frame: [u8; 5]) -> Result<Option<Reading>, SensorError> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(SensorError::Checksum);
    }
    if frame == [0; 5] {
        return Ok(None);
    }

    let (humidity, temperature) = match model {
        SensorModel::Dht22 => {
            let humidity = f32::from(u16::from_be_bytes([frame[0], frame[1]])) / 10.0;
            let magnitude = f32::from(u16::from_be_bytes([frame[2] & 0x7F, frame[3]])) / 10.0;
            let temperature = if frame[2] & 0x80 != 0 { -magnitude } else { magnitude };
            (humidity, temperature)
        }
        SensorModel::Dht11 => {
            let humidity = f32::from(frame[0]) + f32::from(frame[1]) / 10.0;
            let magnitude = f32::from(frame[2]) + f32::from(frame[3] & 0x7F) / 10.0;
            let temperature = if frame[3] & 0x80 != 0 { -magnitude } else { magnitude };
            (humidity, temperature)
        }
    };

    if !(0.0..=100.0).contains(&humidity) {
        return Ok(None);
    }

    Ok(Some(Reading {
        temperature_celsius: temperature,
        humidity_percent: humidity,
    }))
}

/// DHT reading source with a minimum spacing between transactions.
///
/// DHT sensors need about two seconds between conversions. Queries inside
/// that window return the last successful measurement.
pub struct DhtSource<R> {
    reader: R,
    model: SensorModel,
    min_interval: Duration,
    cached: Option<(Instant, Option<Reading>)>,
}

impl<R: FrameReader> DhtSource<R> {
    pub fn new(reader: R, model: SensorModel, min_interval: Duration) -> Self {
        Self {
            reader,
            model,
            min_interval,
            cached: None,
        }
    }

    fn measure(&mut self) -> Result<Option<Reading>, SensorError> {
        if let Some((taken_at, reading)) = self.cached {
            if taken_at.elapsed() < self.min_interval {
                return Ok(reading);
            }
        }

        let frame = self.reader.read_frame()?;
        let reading = decode(self.model, frame)?;
        tracing::debug!(?frame, ?reading, "{} transaction complete", self.model);
        self.cached = Some((Instant::now(), reading));
        Ok(reading)
    }
}

impl<R: FrameReader> ReadingSource for DhtSource<R> {
    fn temperature(&mut self) -> Result<Option<f32>, SensorError> {
        Ok(self.measure()?.map(|r| r.temperature_celsius))
    }

    fn humidity(&mut self) -> Result<Option<f32>, SensorError> {
        Ok(self.measure()?.map(|r| r.humidity_percent))
    }

    fn holds_resources(&self) -> bool {
        !self.reader.is_released()
    }

    fn release(&mut self) {
        self.reader.release();
        self.cached = None;
    }
}
