//! Module `peripherals` describes the adapter-wide settings that are not
//! specific to one bus: which subsystems own the pins, the target power
//! pins, the I2C pullup resistors, and the feature set a device reports.

use serde::{Deserialize, Serialize};

/// `BusMode` selects which subsystems own the adapter's pins.
///
/// Pins not claimed by I2C or SPI are left to the GPIO subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BusMode {
    GpioOnly = 0x00,
    SpiGpio = 0x01,
    GpioI2c = 0x02,
    SpiI2c = 0x03,
}

/// `CONFIG_QUERY` asks `configure` to report the current mode unchanged.
pub(crate) const CONFIG_QUERY: u8 = 0x80;

const CONFIG_SPI_MASK: u8 = 0x01;
const CONFIG_I2C_MASK: u8 = 0x02;

impl BusMode {
    pub(crate) fn from_bits(bits: u8) -> Option<BusMode> {
        match bits {
            0x00 => Some(BusMode::GpioOnly),
            0x01 => Some(BusMode::SpiGpio),
            0x02 => Some(BusMode::GpioI2c),
            0x03 => Some(BusMode::SpiI2c),
            _ => None,
        }
    }

    pub(crate) fn bits(self) -> u8 {
        self as u8
    }

    /// `spi_enabled` reports whether the SPI subsystem owns its pins.
    pub fn spi_enabled(self) -> bool {
        self.bits() & CONFIG_SPI_MASK != 0
    }

    /// `i2c_enabled` reports whether the I2C subsystem owns its pins.
    pub fn i2c_enabled(self) -> bool {
        self.bits() & CONFIG_I2C_MASK != 0
    }
}

/// `MASK_QUERY` asks the pullup and power setters to report the current
/// mask unchanged.
pub(crate) const MASK_QUERY: u8 = 0x80;

bitflags::bitflags! {
    /// The I2C pullup resistors, one per bus line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Pullups: u8 {
        const SCL = 0x01;
        const SDA = 0x02;
        const BOTH = 0x03;
    }
}

bitflags::bitflags! {
    /// The two target power pins.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Power: u8 {
        const PIN4 = 0x01;
        const PIN6 = 0x02;
        const BOTH = 0x03;
    }
}

bitflags::bitflags! {
    /// Subsystems supported by a particular adapter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Features: u32 {
        const SPI = 0x0000_0001;
        const I2C = 0x0000_0002;
        const GPIO = 0x0000_0008;
        const I2C_MONITOR = 0x0000_0010;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_mode_bits() {
        for bits in 0..4u8 {
            let mode = BusMode::from_bits(bits).unwrap();
            assert_eq!(mode.bits(), bits);
        }
        assert_eq!(BusMode::from_bits(CONFIG_QUERY), None);
        assert!(BusMode::SpiI2c.spi_enabled() && BusMode::SpiI2c.i2c_enabled());
        assert!(!BusMode::GpioOnly.spi_enabled() && !BusMode::GpioOnly.i2c_enabled());
        assert!(BusMode::GpioI2c.i2c_enabled() && !BusMode::GpioI2c.spi_enabled());
    }

    #[test]
    fn masks_match_driver_values() {
        assert_eq!(Pullups::BOTH.bits(), 0x03);
        assert_eq!(Power::empty().bits(), 0x00);
        assert_eq!(
            (Features::SPI | Features::I2C | Features::GPIO | Features::I2C_MONITOR).bits(),
            0x1b
        );
    }
}
