//! Module `poll` contains the asynchronous event types used with
//! `Adapter::poll`.
//!
//! Slave-mode receptions and bus monitor captures arrive asynchronously with
//! respect to the host. A poll reports at most one pending kind, and that
//! kind stays pending until the matching drain call consumes it:
//!
//! | event        | drained by               |
//! |--------------|--------------------------|
//! | `I2cRead`    | `i2c_slave_read`         |
//! | `I2cWrite`   | `i2c_slave_write_stats`  |
//! | `Spi`        | `spi_slave_read`         |
//! | `I2cMonitor` | `i2c_monitor_read`       |
//!
//! Polling again before draining reports the same event again rather than
//! moving on to a different one.

use core::time::Duration;

const ASYNC_I2C_READ: u32 = 0x01;
const ASYNC_I2C_WRITE: u32 = 0x02;
const ASYNC_SPI: u32 = 0x04;
const ASYNC_I2C_MONITOR: u32 = 0x08;

/// `AsyncEvent` is the outcome of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsyncEvent {
    /// Nothing arrived before the timeout.
    NoData,
    /// An external master wrote to the adapter in I2C slave mode.
    I2cRead,
    /// An external master read the adapter's slave response.
    I2cWrite,
    /// An SPI slave transaction completed.
    Spi,
    /// The bus monitor captured data.
    I2cMonitor,
}

impl AsyncEvent {
    /// `from_mask` picks one event from a driver poll result. When several
    /// kinds are pending the lowest bit wins; the others are reported again
    /// by a later poll.
    pub(crate) fn from_mask(mask: u32) -> AsyncEvent {
        if mask & ASYNC_I2C_READ != 0 {
            AsyncEvent::I2cRead
        } else if mask & ASYNC_I2C_WRITE != 0 {
            AsyncEvent::I2cWrite
        } else if mask & ASYNC_SPI != 0 {
            AsyncEvent::Spi
        } else if mask & ASYNC_I2C_MONITOR != 0 {
            AsyncEvent::I2cMonitor
        } else {
            AsyncEvent::NoData
        }
    }

    /// `bits` returns the driver's mask value for this event.
    pub fn bits(self) -> u32 {
        match self {
            AsyncEvent::NoData => 0,
            AsyncEvent::I2cRead => ASYNC_I2C_READ,
            AsyncEvent::I2cWrite => ASYNC_I2C_WRITE,
            AsyncEvent::Spi => ASYNC_SPI,
            AsyncEvent::I2cMonitor => ASYNC_I2C_MONITOR,
        }
    }
}

/// `Timeout` bounds how long a poll may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Block until something arrives.
    Forever,
    /// Check once and return immediately.
    NonBlocking,
    /// Wait at most this many milliseconds.
    Millis(u32),
}

impl Timeout {
    pub(crate) fn raw(self) -> i32 {
        match self {
            Timeout::Forever => -1,
            Timeout::NonBlocking => 0,
            Timeout::Millis(0) => 0,
            Timeout::Millis(ms) => ms.min(i32::MAX as u32) as i32,
        }
    }
}

impl From<i32> for Timeout {
    /// Negative values block, zero is non-blocking, and positive values are
    /// milliseconds.
    fn from(raw: i32) -> Self {
        if raw < 0 {
            Timeout::Forever
        } else if raw == 0 {
            Timeout::NonBlocking
        } else {
            Timeout::Millis(raw as u32)
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        let ms = d.as_millis();
        if ms == 0 {
            Timeout::NonBlocking
        } else {
            Timeout::Millis(ms.min(u32::MAX as u128) as u32)
        }
    }
}

/// `SlaveEvent` is a polled event together with the result of draining it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveEvent {
    /// An external I2C master wrote `len` bytes to slave address `addr`;
    /// the bytes are at the start of the caller's buffer.
    MasterWrite { addr: u8, len: usize },
    /// An external I2C master read `len` bytes of the slave response.
    MasterRead { len: usize },
    /// An SPI slave transaction delivered `len` bytes.
    Spi { len: usize },
}

/// `Pending` remembers a reported event until it is drained.
#[derive(Debug, Default)]
pub(crate) struct Pending {
    event: Option<AsyncEvent>,
}

impl Pending {
    /// `undrained` returns the event still awaiting its drain, if any.
    pub fn undrained(&self) -> Option<AsyncEvent> {
        self.event
    }

    pub fn report(&mut self, event: AsyncEvent) {
        if event != AsyncEvent::NoData {
            self.event = Some(event);
        }
    }

    /// `drain` clears the pending event if it is of the given kind.
    pub fn drain(&mut self, kind: AsyncEvent) {
        if self.event == Some(kind) {
            self.event = None;
        }
    }

    pub fn clear(&mut self) {
        self.event = None;
    }
}
