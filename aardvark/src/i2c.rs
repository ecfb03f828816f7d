//! Module `i2c` contains the I2C transaction flags and address rules.

use crate::Error;

bitflags::bitflags! {
    /// Modifiers for a single I2C master transaction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct I2cFlags: u8 {
        /// The slave address is a 10-bit address.
        const TEN_BIT_ADDR = 0x01;
        /// Use the combined format for a 10-bit read.
        const COMBINED_FMT = 0x02;
        /// Leave the bus held after the transaction so the next one starts
        /// with a repeated start condition.
        const NO_STOP = 0x04;
        /// The first byte read is the count of bytes that follow.
        const SIZED_READ = 0x10;
        /// Like `SIZED_READ`, with one extra trailing byte (e.g. a PEC).
        const SIZED_READ_EXTRA1 = 0x20;
    }
}

/// `I2cStatus` is how an I2C transaction ended on the bus, as reported by
/// the extended transfer calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum I2cStatus {
    Ok = 0,
    /// Illegal start or stop condition seen on the bus.
    BusError = 1,
    /// The adapter was addressed as a slave in the middle of a transaction.
    SlaAck = 2,
    /// Nobody acknowledged the slave address.
    SlaNack = 3,
    /// The slave refused a data byte.
    DataNack = 4,
    /// Another master won arbitration.
    ArbLost = 5,
    /// The bus stayed busy beyond the bus timeout.
    BusLocked = 6,
    /// An external master acknowledged the last byte the adapter sent as a
    /// slave, so it wanted more.
    LastDataAck = 7,
}

impl I2cStatus {
    /// `from_raw` interprets a non-negative status from the driver. Values
    /// this crate does not know are reported as `BusError`.
    pub fn from_raw(raw: u32) -> I2cStatus {
        match raw {
            0 => I2cStatus::Ok,
            2 => I2cStatus::SlaAck,
            3 => I2cStatus::SlaNack,
            4 => I2cStatus::DataNack,
            5 => I2cStatus::ArbLost,
            6 => I2cStatus::BusLocked,
            7 => I2cStatus::LastDataAck,
            _ => I2cStatus::BusError,
        }
    }

    pub fn is_ok(self) -> bool {
        self == I2cStatus::Ok
    }
}

/// `MAX_7BIT_ADDR` is the highest 7-bit slave address.
pub const MAX_7BIT_ADDR: u16 = 0x7f;

/// `MAX_10BIT_ADDR` is the highest 10-bit slave address.
pub const MAX_10BIT_ADDR: u16 = 0x3ff;

/// `check_address` rejects a slave address too wide for the addressing
/// mode selected by `flags`.
pub fn check_address(addr: u16, flags: I2cFlags) -> Result<(), Error> {
    let max = if flags.contains(I2cFlags::TEN_BIT_ADDR) {
        MAX_10BIT_ADDR
    } else {
        MAX_7BIT_ADDR
    };
    if addr > max {
        return Err(Error::Request("slave address out of range"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_width() {
        assert!(check_address(0x50, I2cFlags::empty()).is_ok());
        assert!(check_address(0x80, I2cFlags::empty()).is_err());
        assert!(check_address(0x2a5, I2cFlags::TEN_BIT_ADDR).is_ok());
        assert!(check_address(0x400, I2cFlags::TEN_BIT_ADDR).is_err());
    }

    #[test]
    fn flag_values_match_driver() {
        assert_eq!(I2cFlags::TEN_BIT_ADDR.bits(), 0x01);
        assert_eq!(I2cFlags::COMBINED_FMT.bits(), 0x02);
        assert_eq!(I2cFlags::NO_STOP.bits(), 0x04);
        assert_eq!(I2cFlags::SIZED_READ.bits(), 0x10);
        assert_eq!(I2cFlags::SIZED_READ_EXTRA1.bits(), 0x20);
    }

    #[test]
    fn status_values_match_driver() {
        for raw in 0..8u32 {
            assert_eq!(I2cStatus::from_raw(raw) as u32, raw);
        }
        assert_eq!(I2cStatus::from_raw(3), I2cStatus::SlaNack);
        assert_eq!(I2cStatus::from_raw(42), I2cStatus::BusError);
        assert!(I2cStatus::Ok.is_ok());
        assert!(!I2cStatus::DataNack.is_ok());
    }
}
