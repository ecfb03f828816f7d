//! Module `spi` contains the clocking configuration for the SPI subsystem.
//!
//! The SPI operations themselves are methods on `Adapter`, since they
//! share the session's config state with the other subsystems.

use serde::{Deserialize, Serialize};

/// `Polarity` selects which clock transition is the leading edge.
///
/// `RisingFalling` idles SCK low, so the clock goes low-to-high on the
/// leading edge and high-to-low on the trailing edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Polarity {
    RisingFalling = 0,
    FallingRising = 1,
}

/// `Phase` selects whether data is sampled or set up on the leading edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Phase {
    SampleSetup = 0,
    SetupSample = 1,
}

/// `BitOrder` selects which end of each byte is shifted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BitOrder {
    Msb = 0,
    Lsb = 1,
}

/// `SsPolarity` is the active level of the slave select line in master
/// mode. In slave mode the adapter always treats SS as active low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SsPolarity {
    ActiveLow = 0,
    ActiveHigh = 1,
}

/// `Config` is the full clocking configuration passed to `spi_configure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub polarity: Polarity,
    pub phase: Phase,
    pub bit_order: BitOrder,
}

/// `DEFAULT_CONFIG` is SPI mode 0, most significant bit first.
pub const DEFAULT_CONFIG: Config = Config {
    polarity: Polarity::RisingFalling,
    phase: Phase::SampleSetup,
    bit_order: BitOrder::Msb,
};

impl Default for Config {
    fn default() -> Self {
        DEFAULT_CONFIG
    }
}

impl Config {
    /// `mode` returns the conventional SPI mode number (0 through 3) for
    /// this polarity and phase.
    pub fn mode(&self) -> u8 {
        let cpol = match self.polarity {
            Polarity::RisingFalling => 0,
            Polarity::FallingRising => 1,
        };
        let cpha = match self.phase {
            Phase::SampleSetup => 0,
            Phase::SetupSample => 1,
        };
        (cpol << 1) | cpha
    }

    pub(crate) fn raw(&self) -> (u8, u8, u8) {
        (
            self.polarity as u8,
            self.phase as u8,
            self.bit_order as u8,
        )
    }
}
