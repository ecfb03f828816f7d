//! Module `status` contains the status code taxonomy reported by the adapter
//! driver.
//!
//! Every driver entry point returns a single signed integer. Negative values
//! are one of the `Status` codes below and non-negative values are the
//! success payload (a byte count, a bitmask, or a plain "ok"). The function
//! `check` is the one place where that sign convention is interpreted; the
//! rest of this crate works in terms of `Result`.

use core::fmt;

/// `Status` is a failure reported by the adapter driver.
///
/// The discriminants match the driver ABI, grouped by numeric range:
/// general errors from -1, I2C from -100, SPI from -200, GPIO at -400 and the
/// I2C bus monitor from -500.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    UnableToLoadLibrary = -1,
    UnableToLoadDriver = -2,
    UnableToLoadFunction = -3,
    IncompatibleLibrary = -4,
    IncompatibleDevice = -5,
    CommunicationError = -6,
    UnableToOpen = -7,
    UnableToClose = -8,
    InvalidHandle = -9,
    ConfigError = -10,

    I2cNotAvailable = -100,
    I2cNotEnabled = -101,
    I2cReadError = -102,
    I2cWriteError = -103,
    I2cSlaveBadConfig = -104,
    I2cSlaveReadError = -105,
    I2cSlaveTimeout = -106,
    I2cDroppedExcessBytes = -107,
    I2cBusAlreadyFree = -108,

    SpiNotAvailable = -200,
    SpiNotEnabled = -201,
    SpiWriteError = -202,
    SpiSlaveReadError = -203,
    SpiSlaveTimeout = -204,
    SpiDroppedExcessBytes = -205,

    GpioNotAvailable = -400,

    I2cMonitorNotAvailable = -500,
    I2cMonitorNotEnabled = -501,
}

const ALL: [Status; 28] = [
    Status::UnableToLoadLibrary,
    Status::UnableToLoadDriver,
    Status::UnableToLoadFunction,
    Status::IncompatibleLibrary,
    Status::IncompatibleDevice,
    Status::CommunicationError,
    Status::UnableToOpen,
    Status::UnableToClose,
    Status::InvalidHandle,
    Status::ConfigError,
    Status::I2cNotAvailable,
    Status::I2cNotEnabled,
    Status::I2cReadError,
    Status::I2cWriteError,
    Status::I2cSlaveBadConfig,
    Status::I2cSlaveReadError,
    Status::I2cSlaveTimeout,
    Status::I2cDroppedExcessBytes,
    Status::I2cBusAlreadyFree,
    Status::SpiNotAvailable,
    Status::SpiNotEnabled,
    Status::SpiWriteError,
    Status::SpiSlaveReadError,
    Status::SpiSlaveTimeout,
    Status::SpiDroppedExcessBytes,
    Status::GpioNotAvailable,
    Status::I2cMonitorNotAvailable,
    Status::I2cMonitorNotEnabled,
];

impl Status {
    /// `from_code` maps a raw negative driver result onto its `Status`.
    ///
    /// Returns `None` for zero, positive values and negative values that are
    /// not part of the taxonomy.
    pub fn from_code(code: i32) -> Option<Status> {
        ALL.iter().copied().find(|s| s.code() == code)
    }

    /// `code` returns the raw driver value for this status.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// `as_str` returns the driver's descriptive name for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::UnableToLoadLibrary => "unable to load library",
            Status::UnableToLoadDriver => "unable to load USB driver",
            Status::UnableToLoadFunction => "unable to load binding function",
            Status::IncompatibleLibrary => "incompatible library version",
            Status::IncompatibleDevice => "incompatible device version",
            Status::CommunicationError => "communication error",
            Status::UnableToOpen => "unable to open device",
            Status::UnableToClose => "unable to close device",
            Status::InvalidHandle => "invalid device handle",
            Status::ConfigError => "configuration error",
            Status::I2cNotAvailable => "i2c feature not available",
            Status::I2cNotEnabled => "i2c not enabled",
            Status::I2cReadError => "i2c read error",
            Status::I2cWriteError => "i2c write error",
            Status::I2cSlaveBadConfig => "i2c slave enable bad config",
            Status::I2cSlaveReadError => "i2c slave read error",
            Status::I2cSlaveTimeout => "i2c slave timeout",
            Status::I2cDroppedExcessBytes => "i2c slave dropped excess bytes",
            Status::I2cBusAlreadyFree => "i2c bus already free",
            Status::SpiNotAvailable => "spi feature not available",
            Status::SpiNotEnabled => "spi not enabled",
            Status::SpiWriteError => "spi write error",
            Status::SpiSlaveReadError => "spi slave read error",
            Status::SpiSlaveTimeout => "spi slave timeout",
            Status::SpiDroppedExcessBytes => "spi dropped excess bytes",
            Status::GpioNotAvailable => "gpio feature not available",
            Status::I2cMonitorNotAvailable => "i2c monitor not available",
            Status::I2cMonitorNotEnabled => "i2c monitor not enabled",
        }
    }

    /// `is_i2c` reports whether this status belongs to the I2C range,
    /// including the bus monitor.
    pub fn is_i2c(self) -> bool {
        let c = self.code();
        (-199..=-100).contains(&c) || (-599..=-500).contains(&c)
    }

    /// `is_spi` reports whether this status belongs to the SPI range.
    pub fn is_spi(self) -> bool {
        (-299..=-200).contains(&self.code())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for Status {}

/// `status_string` looks up the description of a raw driver result.
///
/// Zero is "ok". Codes outside the taxonomy yield `None`, as does any
/// positive value since those are payloads rather than statuses.
pub fn status_string(code: i32) -> Option<&'static str> {
    if code == 0 {
        return Some("ok");
    }
    Status::from_code(code).map(Status::as_str)
}

/// `check` interprets a raw driver result.
///
/// Non-negative results are returned as the payload. A negative result
/// outside the known taxonomy is reported as `CommunicationError`.
pub fn check(ret: i32) -> Result<u32, Status> {
    if ret >= 0 {
        Ok(ret as u32)
    } else {
        Err(Status::from_code(ret).unwrap_or(Status::CommunicationError))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_the_table() {
        for s in ALL.iter() {
            assert_eq!(Status::from_code(s.code()), Some(*s));
        }
        assert_eq!(Status::from_code(-11), None);
        assert_eq!(Status::from_code(0), None);
    }

    #[test]
    fn check_separates_payload_from_status() {
        assert_eq!(check(0), Ok(0));
        assert_eq!(check(42), Ok(42));
        assert_eq!(check(-9), Err(Status::InvalidHandle));
        assert_eq!(check(-106), Err(Status::I2cSlaveTimeout));
        assert_eq!(check(-7777), Err(Status::CommunicationError));
    }

    #[test]
    fn status_strings() {
        assert_eq!(status_string(0), Some("ok"));
        assert_eq!(status_string(-501), Some("i2c monitor not enabled"));
        assert_eq!(status_string(-300), None);
        assert_eq!(status_string(12), None);
        assert_eq!(Status::SpiWriteError.to_string(), "spi write error");
    }

    #[test]
    fn ranges() {
        assert!(Status::I2cWriteError.is_i2c());
        assert!(Status::I2cMonitorNotEnabled.is_i2c());
        assert!(!Status::SpiNotEnabled.is_i2c());
        assert!(Status::SpiNotEnabled.is_spi());
        assert!(!Status::ConfigError.is_spi());
    }
}
