//! Module `low` is the seam between this crate and whatever actually talks
//! to the adapter hardware.
//!
//! The traits here mirror the fixed-signature entry points of the adapter
//! driver: every per-session call returns a raw `i32` where negative values
//! are status codes and non-negative values are the payload. Buffers are
//! passed as slices that the caller has already clamped, so an
//! implementation may use the full slice length as the transfer length.
//!
//! The crate's own `sim` module provides an in-process implementation.

use crate::status::Status;

/// `Versions` is the version matrix reported by a driver, in the same
/// `0xMMmm` encoding the driver uses (`0x050a` is v5.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Versions {
    /// Version of the driver software itself.
    pub software: u16,
    /// Oldest binding API version the driver is willing to serve.
    pub api_required: u16,
}

/// `DeviceVersion` is the version information read from an open adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceVersion {
    pub firmware: u16,
    pub hardware: u16,
}

/// `Driver` is the process-level half of the driver seam.
pub trait Driver {
    type Device: Device;

    /// `version` reports the driver's version matrix. It is consulted once
    /// per `Registry`.
    fn version(&self) -> Versions;

    /// `find_devices` fills `devices` with port numbers and `unique_ids`
    /// with serial numbers, writing at most the length of each slice.
    ///
    /// Ports that are already open are ORed with `PORT_NOT_FREE`. Returns
    /// the number of devices attached regardless of the slice sizes.
    fn find_devices(&mut self, devices: &mut [u16], unique_ids: &mut [u32]) -> i32;

    /// `open` claims the adapter on `port` for exclusive use.
    fn open(&mut self, port: u16) -> Result<Self::Device, Status>;
}

/// `Device` is one open adapter session in the raw calling convention.
pub trait Device {
    fn close(&mut self) -> i32;
    fn features(&mut self) -> i32;
    fn unique_id(&mut self) -> u32;
    fn version(&mut self) -> DeviceVersion;

    fn configure(&mut self, config: u8) -> i32;
    fn target_power(&mut self, mask: u8) -> i32;

    /// `async_poll` waits for pending asynchronous data. Negative timeouts
    /// block indefinitely and zero is a non-blocking check. Returns a mask
    /// of pending kinds, or zero when nothing arrived in time.
    fn async_poll(&mut self, timeout_ms: i32) -> i32;

    fn i2c_free_bus(&mut self) -> i32;
    fn i2c_bitrate(&mut self, khz: i32) -> i32;
    fn i2c_bus_timeout(&mut self, timeout_ms: u16) -> i32;
    fn i2c_pullup(&mut self, mask: u8) -> i32;
    fn i2c_read(&mut self, addr: u16, flags: u8, data: &mut [u8]) -> i32;
    fn i2c_write(&mut self, addr: u16, flags: u8, data: &[u8]) -> i32;

    /// `i2c_read_ext` is `i2c_read` that stores the byte count in `num_read`
    /// and returns how the transaction ended (an `I2cStatus` value) instead.
    fn i2c_read_ext(&mut self, addr: u16, flags: u8, data: &mut [u8], num_read: &mut u16) -> i32;
    fn i2c_write_ext(&mut self, addr: u16, flags: u8, data: &[u8], num_written: &mut u16) -> i32;

    fn i2c_slave_enable(&mut self, addr: u8, max_tx: u16, max_rx: u16) -> i32;
    fn i2c_slave_disable(&mut self) -> i32;
    fn i2c_slave_set_response(&mut self, data: &[u8]) -> i32;
    fn i2c_slave_write_stats(&mut self) -> i32;
    fn i2c_slave_read(&mut self, addr: &mut u8, data: &mut [u8]) -> i32;
    fn i2c_slave_write_stats_ext(&mut self, num_written: &mut u16) -> i32;
    fn i2c_slave_read_ext(&mut self, addr: &mut u8, data: &mut [u8], num_read: &mut u16) -> i32;

    fn i2c_monitor_enable(&mut self) -> i32;
    fn i2c_monitor_disable(&mut self) -> i32;
    fn i2c_monitor_read(&mut self, data: &mut [u16]) -> i32;

    fn spi_bitrate(&mut self, khz: i32) -> i32;
    fn spi_configure(&mut self, polarity: u8, phase: u8, bit_order: u8) -> i32;
    fn spi_master_ss_polarity(&mut self, polarity: u8) -> i32;

    /// `spi_write` shifts out `data_out` while capturing into `data_in`.
    /// Returns the number of bytes captured.
    fn spi_write(&mut self, data_out: &[u8], data_in: &mut [u8]) -> i32;

    fn spi_slave_enable(&mut self) -> i32;
    fn spi_slave_disable(&mut self) -> i32;
    fn spi_slave_set_response(&mut self, data: &[u8]) -> i32;
    fn spi_slave_read(&mut self, data: &mut [u8]) -> i32;

    fn gpio_direction(&mut self, mask: u8) -> i32;
    fn gpio_pullup(&mut self, mask: u8) -> i32;
    fn gpio_get(&mut self) -> i32;
    fn gpio_set(&mut self, value: u8) -> i32;
    fn gpio_change(&mut self, timeout_ms: u16) -> i32;
}
