//! Poll loop and shutdown handling.
//!
//! The loop is single-threaded: read, report, sleep. SIGINT/SIGTERM only
//! record the signal number in a shared flag; the loop checks it at the top
//! of every iteration and while sleeping, then returns so the caller can
//! release the sensor.

use crate::error::{AppError, SensorError, ServiceError};
use crate::sensors::{Reading, ReadingSource};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep between shutdown checks.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Cancellation token set from a signal handler
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    signal: Arc<AtomicUsize>,
}

impl Shutdown {
    /// Create a token that is set when SIGINT or SIGTERM arrives.
    pub fn register() -> Result<Self, ServiceError> {
        let shutdown = Self::default();
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register_usize(signal, shutdown.signal.clone(), signal as usize)
                .map_err(|e| ServiceError::SignalError(e.to_string()))?;
        }
        Ok(shutdown)
    }

    /// Record `signal` as if it had been delivered.
    #[cfg(test)]
    pub fn trigger(&self, signal: i32) {
        self.signal.store(signal as usize, Ordering::SeqCst);
    }

    /// The signal that requested shutdown, if any
    pub fn requested(&self) -> Option<i32> {
        match self.signal.load(Ordering::SeqCst) {
            0 => None,
            signal => Some(signal as i32),
        }
    }

    /// Sleep for `duration` unless shutdown is requested first.
    ///
    /// Returns `true` if the sleep was cut short. A duration past the end of
    /// the clock sleeps until a signal arrives.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now().checked_add(duration);
        loop {
            if self.requested().is_some() {
                return true;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    SLEEP_SLICE.min(deadline - now)
                }
                None => SLEEP_SLICE,
            };
            thread::sleep(slice);
        }
    }
}

/// Result of a single poll
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// A reading was written to the data channel.
    Emitted(Reading),
    /// The sensor returned no data.
    Missed,
    /// The driver reported a failure worth retrying.
    Recovered,
}

/// Why the loop stopped
#[derive(Debug)]
pub enum LoopExit {
    Signalled(i32),
    Fatal(AppError),
}

/// Counters kept across iterations
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
    pub emitted: u64,
    pub misses: u64,
    pub recoverable_errors: u64,
}

/// Temperature first; humidity is not queried if that fails.
fn query(source: &mut dyn ReadingSource) -> Result<(Option<f32>, Option<f32>), SensorError> {
    let temperature = source.temperature()?;
    let humidity = source.humidity()?;
    Ok((temperature, humidity))
}

/// Reads the sensor on a fixed interval and writes `DATA:` lines to `out`.
pub struct Poller<W: Write> {
    interval: Duration,
    out: W,
    stats: PollStats,
}

impl<W: Write> Poller<W> {
    pub fn new(interval: Duration, out: W) -> Self {
        Self {
            interval,
            out,
            stats: PollStats::default(),
        }
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    /// Query the source once and report the result.
    ///
    /// Misses and recoverable driver errors are logged and absorbed; any
    /// other failure is returned.
    pub fn poll_once(&mut self, source: &mut dyn ReadingSource) -> Result<PollOutcome, AppError> {
        match query(source) {
            Ok((Some(temperature), Some(humidity))) => {
                let reading = Reading {
                    temperature_celsius: temperature,
                    humidity_percent: humidity,
                };
                self.emit(&reading)?;
                self.stats.emitted += 1;
                Ok(PollOutcome::Emitted(reading))
            }
            Ok(_) => {
                tracing::info!("Failed to retrieve data from sensor. Retrying...");
                self.stats.misses += 1;
                Ok(PollOutcome::Missed)
            }
            Err(e) if e.is_recoverable() => {
                tracing::error!("Reading error: {}", e);
                self.stats.recoverable_errors += 1;
                Ok(PollOutcome::Recovered)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn emit(&mut self, reading: &Reading) -> Result<(), ServiceError> {
        writeln!(
            self.out,
            "DATA: {:.1},{:.1}",
            reading.temperature_celsius, reading.humidity_percent
        )?;
        self.out.flush()?;
        Ok(())
    }

    /// Poll until a signal arrives or an unclassified error occurs.
    pub fn run(&mut self, source: &mut dyn ReadingSource, shutdown: &Shutdown) -> LoopExit {
        loop {
            if let Some(signal) = shutdown.requested() {
                return LoopExit::Signalled(signal);
            }

            match self.poll_once(source) {
                Ok(PollOutcome::Emitted(reading)) => tracing::trace!(
                    temperature = reading.temperature_celsius,
                    humidity = reading.humidity_percent,
                    "Reading emitted"
                ),
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("An unexpected error occurred: {}", e);
                    return LoopExit::Fatal(e);
                }
            }

            if shutdown.sleep(self.interval) {
                // requested() is set whenever sleep is cut short
                return LoopExit::Signalled(shutdown.requested().unwrap_or_default());
            }
        }
    }
}

/// Run the poll loop to completion, then release the sensor if it was
/// acquired. Release happens exactly once whichever way the loop ends.
pub fn run_session<W: Write>(
    source: &mut dyn ReadingSource,
    shutdown: &Shutdown,
    interval: Duration,
    out: W,
) -> (LoopExit, PollStats) {
    let mut poller = Poller::new(interval, out);
    let exit = poller.run(source, shutdown);
    if let LoopExit::Signalled(signal) = exit {
        tracing::info!("Caught signal {}. Initiating cleanup...", signal);
    }
    tracing::debug!(stats = ?poller.stats(), "Poll loop stopped");

    if source.holds_resources() {
        tracing::info!("Releasing DHT sensor resources...");
        source.release();
    }

    (exit, poller.stats())
}
