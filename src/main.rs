//! Polls a DHT temperature/humidity sensor and prints readings.
//!
//! Usage: `dht-poller <polling_interval_sec> <gpio_pin_bcm_number>`
//!
//! Readings go to standard output as `DATA: <temp_c>,<humidity_pct>`, one
//! line per interval. Diagnostics go to standard error. Hosts without a GPIO
//! character device (or with `DHT_POLLER_SIMULATE=true`) print a fixed
//! `20.0,50.0` reading instead.
//!
//! # Exit status
//!
//! * `0` after a termination signal or when the loop stops on a sensor fault
//! * `1` when the arguments are invalid
//! * `2` when the sensor cannot be set up

use std::io;
use std::process::ExitCode;

mod cli;
mod config;
mod error;
mod logging;
mod sensors;
mod service;

use crate::cli::Cli;
use crate::config::{PollerConfig, Settings};
use crate::error::{AppError, Result};
use crate::sensors::Platform;
use crate::service::Shutdown;

fn run(settings: &Settings) -> Result<()> {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "dht-poller".to_string());
    let rest: Vec<String> = args.collect();

    let cli = Cli::parse_from(&rest)?;
    if cli.help {
        eprintln!("{}", Cli::help_text(&program));
        return Ok(());
    }

    let positional = cli.positional(&program)?;
    let platform = Platform::detect(settings);
    let config = PollerConfig::from_args(&positional, &platform)?;

    tracing::info!("Using polling interval: {:?} seconds", config.interval.as_secs_f64());
    match config.pin {
        Some(pin) => tracing::info!("Using data pin: {}", pin),
        None => tracing::info!(
            "GPIO not available; ignoring pin argument '{}' and using simulated readings.",
            positional.pin
        ),
    }

    let shutdown = Shutdown::register()?;
    let mut source = sensors::open_source(&platform, &config, settings)?;

    service::run_session(source.as_mut(), &shutdown, config.interval, io::stdout());

    Ok(())
}

fn main() -> ExitCode {
    let loaded = Settings::from_env();
    let defaults = Settings::default();
    let settings = loaded.as_ref().unwrap_or(&defaults);

    if let Err(e) = logging::init(settings) {
        eprintln!("Error: {:#}", e);
    }
    if let Err(e) = &loaded {
        tracing::error!("{}; using default settings", e);
    }

    finish(run(settings))
}

/// Report how `run` ended and map it to the process exit status.
fn finish(result: Result<()>) -> ExitCode {
    let code = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match &e {
                AppError::Arguments(_) => tracing::error!("{}", e),
                _ => tracing::error!("An unexpected error occurred during main execution: {}", e),
            }
            ExitCode::from(e.exit_code())
        }
    };

    tracing::info!("Script finished.");
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use crate::error::ArgumentError;
    use crate::logging::capture::SharedBuffer;
    use crate::sensors::MockReadingSource;
    use signal_hook::consts::SIGTERM;
    use std::thread;
    use std::time::Duration;

    fn count_lines(log: &str, needle: &str) -> usize {
        log.lines().filter(|line| line.contains(needle)).count()
    }

    #[test]
    fn test_signalled_shutdown_logs_each_step_once() {
        let logs = SharedBuffer::default();
        let shutdown = Shutdown::default();
        let mut source = MockReadingSource::new();
        source.expect_temperature().returning(|| Ok(Some(20.0)));
        source.expect_humidity().returning(|| Ok(Some(50.0)));
        source.expect_holds_resources().times(1).return_const(true);
        source.expect_release().times(1).return_const(());

        let trigger = shutdown.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            trigger.trigger(SIGTERM);
        });

        let code = tracing::subscriber::with_default(
            logging::subscriber("info", LogFormat::Plain, logs.clone()),
            || {
                service::run_session(&mut source, &shutdown, Duration::from_secs(30), io::sink());
                finish(Ok(()))
            },
        );
        handle.join().unwrap();

        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::SUCCESS));
        let log = logs.contents();
        assert_eq!(count_lines(&log, "Caught signal"), 1);
        assert_eq!(count_lines(&log, "Releasing DHT sensor resources..."), 1);
        assert_eq!(count_lines(&log, "Script finished."), 1);
    }

    #[test]
    fn test_argument_error_exit_status() {
        let logs = SharedBuffer::default();
        let code = tracing::subscriber::with_default(
            logging::subscriber("info", LogFormat::Plain, logs.clone()),
            || finish(Err(ArgumentError::NonPositive.into())),
        );

        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::from(1)));
        assert_eq!(
            logs.contents(),
            "Error: Polling interval must be a positive number.\nLog: Script finished.\n"
        );
    }

    #[test]
    fn test_startup_failure_exit_status() {
        let logs = SharedBuffer::default();
        let code = tracing::subscriber::with_default(
            logging::subscriber("info", LogFormat::Plain, logs.clone()),
            || finish(Err(anyhow::anyhow!("chip missing").into())),
        );

        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::from(2)));
        assert!(logs
            .contents()
            .starts_with("Error: An unexpected error occurred during main execution: chip missing\n"));
    }
}
