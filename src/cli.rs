//! Command-line interface argument parsing.
//!
//! The program takes exactly two positional arguments: the polling interval
//! in seconds and the BCM number of the GPIO pin the sensor's data line is
//! wired to. Parsing is done with gumdrop; range checks live in `config`.

use crate::error::ArgumentError;
use crate::sensors::pins::BcmPin;
use gumdrop::Options;

/// dht-poller: print temperature/humidity readings from a DHT sensor
#[derive(Debug, Options)]
pub struct Cli {
    /// Print help message
    #[options(help = "print help message")]
    pub help: bool,

    /// Positional arguments: <polling_interval_sec> <gpio_pin_bcm_number>
    #[options(free, help = "<polling_interval_sec> <gpio_pin_bcm_number>")]
    pub args: Vec<String>,
}

/// Positional arguments after the count check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Positional<'a> {
    pub interval: &'a str,
    pub pin: &'a str,
}

impl Cli {
    /// Parse arguments, excluding the program name
    pub fn parse_from<S: AsRef<str>>(args: &[S]) -> Result<Self, ArgumentError> {
        Self::parse_args_default(args).map_err(|e| ArgumentError::Parse(e.to_string()))
    }

    /// Split the free arguments into interval and pin, enforcing the count.
    pub fn positional(&self, program: &str) -> Result<Positional<'_>, ArgumentError> {
        match self.args.as_slice() {
            [interval, pin] => Ok(Positional { interval, pin }),
            _ => Err(ArgumentError::Usage {
                program: program.to_string(),
            }),
        }
    }

    /// Full usage text shown for `--help`
    pub fn help_text(program: &str) -> String {
        let pins: Vec<String> = BcmPin::supported().map(|p| p.bcm().to_string()).collect();
        format!(
            "Usage: {} <polling_interval_sec> <gpio_pin_bcm_number>\n\nSupported pins (BCM): {}\n\n{}",
            program,
            pins.join(", "),
            Self::usage()
        )
    }
}
