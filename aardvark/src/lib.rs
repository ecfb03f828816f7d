//! Aardvark I2C/SPI/GPIO adapter client library
//!
//! This library is the host side of a USB-attached I2C/SPI/GPIO bridge in the
//! style of the Total Phase Aardvark, allowing Rust programs to act as an I2C
//! or SPI master, to emulate an I2C or SPI slave, to drive the adapter's lines
//! as GPIO, and to passively monitor an I2C bus.
//!
//! The library does not speak USB itself. Everything below the fixed driver
//! call surface is behind the traits in module `low`, so the same API works
//! against a native driver binding or against the in-process simulated
//! adapter in module `sim`.
//!
//! The entry point is `Registry::new`, which takes (and consumes) a driver.
//! Opening a port yields an `AdapterHandle`, and `Registry::adapter` turns a
//! handle back into an `Adapter` that offers the bus operations:
//!
//! ```rust
//! use aardvark::{sim::SimDriver, BusMode, Registry};
//!
//! let mut driver = SimDriver::new();
//! driver.add_port(2237_000_001);
//!
//! let mut registry = Registry::new(driver);
//! let handle = registry.open(0)?;
//! let mut adapter = registry.adapter(handle)?;
//! adapter.configure(BusMode::SpiI2c)?;
//! let khz = adapter.i2c_bitrate(100)?;
//! assert_eq!(khz, 100);
//! # Ok::<(), aardvark::Error>(())
//! ```
//!
//! Every driver call reports failures through the `Status` taxonomy. This
//! library turns those into `Error` values, so the only non-error outcomes a
//! caller sees are payloads: byte counts, masks, or applied settings. A
//! transfer that moved fewer bytes than requested is still a success and is
//! reported through `Transfer`.
//!
//! A single adapter session is not internally synchronized. Callers sharing
//! one `Registry` between threads must guard it with a mutex of their own.

pub mod adapter;
pub mod config;
pub mod frame;
pub mod gpio;
pub mod i2c;
pub mod low;
pub mod memory;
pub mod monitor;
pub mod peripherals;
pub mod poll;
pub mod registry;
pub mod sim;
pub mod spi;
pub mod status;

pub use adapter::Adapter;
pub use config::{ConfigState, Settings};
pub use frame::Transfer;
pub use gpio::GpioBits;
pub use i2c::{I2cFlags, I2cStatus};
pub use monitor::{MonitorDecoder, MonitorEvent};
pub use peripherals::{BusMode, Features, Power, Pullups};
pub use poll::{AsyncEvent, SlaveEvent, Timeout};
pub use registry::{AdapterHandle, OpenInfo, PortDescriptor, Registry};
pub use status::{status_string, Status};

/// `Error` represents the ways an adapter operation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// `Status` indicates that the driver reported a failure.
    ///
    /// The data is the status from the driver's error taxonomy.
    #[error("{0}")]
    Status(#[from] Status),

    /// `Request` indicates that the caller provided invalid arguments that
    /// could not be checked at compile time. The request never reached the
    /// driver.
    #[error("invalid request: {0}")]
    Request(&'static str),

    /// `NoAcknowledge` indicates that an I2C write reached the bus but no
    /// slave acknowledged it, typically because nothing is present at that
    /// address.
    #[error("no acknowledgement from slave 0x{addr:02x}")]
    NoAcknowledge { addr: u16 },
}

impl Error {
    /// `status` returns the driver status behind this error, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::Status(s) => Some(*s),
            _ => None,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
