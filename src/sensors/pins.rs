//! BCM GPIO pins a DHT data line may be wired to.

use crate::error::ArgumentError;
use std::fmt;
use std::str::FromStr;

/// Header GPIOs free for general use on a 40-pin Raspberry Pi header.
static PIN_TABLE: [(&str, u8); 17] = [
    ("4", 4),
    ("5", 5),
    ("6", 6),
    ("12", 12),
    ("13", 13),
    ("16", 16),
    ("17", 17),
    ("18", 18),
    ("19", 19),
    ("20", 20),
    ("21", 21),
    ("22", 22),
    ("23", 23),
    ("24", 24),
    ("25", 25),
    ("26", 26),
    ("27", 27),
];

/// A validated BCM pin number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BcmPin(u8);

impl BcmPin {
    /// Broadcom GPIO number
    pub fn bcm(self) -> u8 {
        self.0
    }

    /// Line offset on the SoC's GPIO character device.
    pub fn line_offset(self) -> u32 {
        u32::from(self.0)
    }

    /// Every supported pin, in table order
    pub fn supported() -> impl Iterator<Item = BcmPin> {
        PIN_TABLE.iter().map(|&(_, bcm)| BcmPin(bcm))
    }
}

impl FromStr for BcmPin {
    type Err = ArgumentError;

    /// Only the exact decimal spelling is accepted ("4", not "04" or " 4").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PIN_TABLE
            .iter()
            .find(|(name, _)| *name == s)
            .map(|&(_, bcm)| BcmPin(bcm))
            .ok_or_else(|| ArgumentError::UnsupportedPin(s.to_string()))
    }
}

impl fmt::Display for BcmPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BCM {} (D{})", self.bcm(), self.bcm())
    }
}
