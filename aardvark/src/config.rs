//! Module `config` holds the per-session configuration cache and the
//! deserialisable `Settings` used to bring a freshly opened adapter into a
//! known state.

use serde::{Deserialize, Serialize};

use crate::gpio::GpioBits;
use crate::low::Device;
use crate::peripherals::{BusMode, Features, Power, Pullups, CONFIG_QUERY, MASK_QUERY};
use crate::spi;
use crate::status::{check, Status};

/// `ConfigState` is what this session last told the adapter, or what the
/// adapter reported when the session was opened.
///
/// Values change only when the matching setter succeeds, and are dropped
/// with the session when its handle is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigState {
    pub mode: BusMode,
    pub i2c_bitrate_khz: u32,
    pub i2c_bus_timeout_ms: u16,
    pub spi_bitrate_khz: u32,
    pub pullups: Pullups,
    pub power: Power,
    pub spi: spi::Config,
    pub ss_polarity: spi::SsPolarity,
    pub gpio_direction: GpioBits,
    pub gpio_pullups: GpioBits,
    pub gpio_output: GpioBits,
    /// Own address while I2C slave mode is enabled.
    pub i2c_slave: Option<u8>,
    pub spi_slave: bool,
    pub monitor: bool,
}

impl ConfigState {
    /// `load` queries the current settings from a newly opened device.
    ///
    /// Settings of a subsystem the device lacks are left at zero. The GPIO
    /// masks and SPI clocking cannot be queried and start at the adapter's
    /// power-up defaults.
    pub(crate) fn load<D: Device>(device: &mut D, features: Features) -> Result<Self, Status> {
        let mode = check(device.configure(CONFIG_QUERY))?;
        let mode = BusMode::from_bits(mode as u8).ok_or(Status::ConfigError)?;
        let power = check(device.target_power(MASK_QUERY))?;

        let (i2c_bitrate_khz, i2c_bus_timeout_ms, pullups) = if features.contains(Features::I2C) {
            (
                check(device.i2c_bitrate(0))?,
                check(device.i2c_bus_timeout(0))? as u16,
                check(device.i2c_pullup(MASK_QUERY))?,
            )
        } else {
            (0, 0, 0)
        };
        let spi_bitrate_khz = if features.contains(Features::SPI) {
            check(device.spi_bitrate(0))?
        } else {
            0
        };

        Ok(ConfigState {
            mode,
            i2c_bitrate_khz,
            i2c_bus_timeout_ms,
            spi_bitrate_khz,
            pullups: Pullups::from_bits_truncate(pullups as u8),
            power: Power::from_bits_truncate(power as u8),
            spi: spi::DEFAULT_CONFIG,
            ss_polarity: spi::SsPolarity::ActiveLow,
            gpio_direction: GpioBits::empty(),
            gpio_pullups: GpioBits::empty(),
            gpio_output: GpioBits::empty(),
            i2c_slave: None,
            spi_slave: false,
            monitor: false,
        })
    }
}

/// `Settings` is an initial adapter configuration, typically loaded from an
/// application's configuration file and applied with `Adapter::apply`.
///
/// Fields left unset keep whatever the adapter currently has. Bus settings
/// are skipped when the resulting mode leaves that bus to GPIO.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: Option<BusMode>,
    pub power: Option<Power>,
    pub pullups: Option<Pullups>,
    pub i2c_bitrate_khz: Option<u32>,
    pub i2c_bus_timeout_ms: Option<u16>,
    pub spi_bitrate_khz: Option<u32>,
    pub spi: Option<spi::Config>,
    pub ss_polarity: Option<spi::SsPolarity>,
}
