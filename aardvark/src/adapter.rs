//! Module `adapter` contains the bus operations available on an open
//! session.
//!
//! An `Adapter` is obtained from `Registry::adapter` and borrows the
//! session exclusively for as long as it lives.
//!
//! Every read and write primitive takes the caller's declared length next
//! to the buffer it applies to. The declared length is clamped to the
//! buffer before the driver sees it, and the count the driver reports is
//! clamped again on the way back, so no transfer ever exceeds
//! `min(declared, buffer length)`.

use core::time::Duration;

use log::{debug, trace, warn};

use crate::config::{ConfigState, Settings};
use crate::frame::{self, Transfer};
use crate::gpio::GpioBits;
use crate::i2c::{self, I2cFlags, I2cStatus};
use crate::low::Device;
use crate::monitor::MonitorEvent;
use crate::peripherals::{BusMode, Features, Power, Pullups, CONFIG_QUERY, MASK_QUERY};
use crate::poll::{AsyncEvent, SlaveEvent, Timeout};
use crate::registry::{AdapterHandle, Session};
use crate::spi;
use crate::status::{check, Status};
use crate::{Error, Result};

/// `Adapter` represents exclusive access to one open adapter session.
pub struct Adapter<'a, D: Device> {
    handle: AdapterHandle,
    session: &'a mut Session<D>,
}

fn bitrate_arg(khz: u32) -> Result<i32> {
    if khz > i32::MAX as u32 {
        return Err(Error::Request("bitrate out of range"));
    }
    Ok(khz as i32)
}

impl<'a, D: Device> Adapter<'a, D> {
    pub(crate) fn new(handle: AdapterHandle, session: &'a mut Session<D>) -> Self {
        Adapter { handle, session }
    }

    pub fn handle(&self) -> AdapterHandle {
        self.handle
    }

    pub fn port(&self) -> u16 {
        self.session.port
    }

    pub fn features(&self) -> Features {
        self.session.features
    }

    /// `config` returns the session's cached configuration.
    pub fn config(&self) -> &ConfigState {
        &self.session.config
    }

    fn device(&mut self) -> &mut D {
        &mut self.session.device
    }

    /// `apply` pushes a whole `Settings` block to the adapter, one setter at
    /// a time: bus mode, target power, pullups, bitrates, then SPI clocking.
    pub fn apply(&mut self, settings: &Settings) -> Result<()> {
        if let Some(mode) = settings.mode {
            self.configure(mode)?;
        }
        let mode = self.session.config.mode;
        if let Some(power) = settings.power {
            self.target_power(power)?;
        }
        if mode.i2c_enabled() {
            if let Some(pullups) = settings.pullups {
                self.i2c_pullup(pullups)?;
            }
            if let Some(khz) = settings.i2c_bitrate_khz {
                self.i2c_bitrate(khz)?;
            }
            if let Some(ms) = settings.i2c_bus_timeout_ms {
                self.i2c_bus_timeout(ms)?;
            }
        }
        if mode.spi_enabled() {
            if let Some(khz) = settings.spi_bitrate_khz {
                self.spi_bitrate(khz)?;
            }
            if let Some(cfg) = settings.spi {
                self.spi_configure(cfg)?;
            }
            if let Some(pol) = settings.ss_polarity {
                self.spi_master_ss_polarity(pol)?;
            }
        }
        Ok(())
    }

    /// `configure` hands the adapter's pins to the subsystems selected by
    /// `mode`. Returns the mode actually applied, which leaves out any
    /// subsystem the adapter lacks.
    pub fn configure(&mut self, mode: BusMode) -> Result<BusMode> {
        let ret = check(self.device().configure(mode.bits()))?;
        let applied = BusMode::from_bits(ret as u8).ok_or(Status::ConfigError)?;
        if applied != mode {
            warn!("requested bus mode {:?}, adapter applied {:?}", mode, applied);
        }
        debug!("bus mode {:?}", applied);
        self.session.config.mode = applied;
        Ok(applied)
    }

    /// `query_mode` reports the current bus mode without changing it.
    pub fn query_mode(&mut self) -> Result<BusMode> {
        let ret = check(self.device().configure(CONFIG_QUERY))?;
        let mode = BusMode::from_bits(ret as u8).ok_or(Status::ConfigError)?;
        self.session.config.mode = mode;
        Ok(mode)
    }

    /// `target_power` switches the target power pins.
    pub fn target_power(&mut self, power: Power) -> Result<Power> {
        let ret = check(self.device().target_power(power.bits()))?;
        let applied = Power::from_bits_truncate(ret as u8);
        debug!("target power {:?}", applied);
        self.session.config.power = applied;
        Ok(applied)
    }

    pub fn query_target_power(&mut self) -> Result<Power> {
        let ret = check(self.device().target_power(MASK_QUERY))?;
        Ok(Power::from_bits_truncate(ret as u8))
    }

    /// `i2c_pullup` switches the I2C pullup resistors.
    pub fn i2c_pullup(&mut self, pullups: Pullups) -> Result<Pullups> {
        let ret = check(self.device().i2c_pullup(pullups.bits()))?;
        let applied = Pullups::from_bits_truncate(ret as u8);
        debug!("i2c pullups {:?}", applied);
        self.session.config.pullups = applied;
        Ok(applied)
    }

    pub fn query_i2c_pullup(&mut self) -> Result<Pullups> {
        let ret = check(self.device().i2c_pullup(MASK_QUERY))?;
        Ok(Pullups::from_bits_truncate(ret as u8))
    }

    /// `i2c_bitrate` sets the I2C clock in kilohertz and returns the rate
    /// the adapter actually applied. Zero leaves the rate unchanged and just
    /// reports it.
    pub fn i2c_bitrate(&mut self, khz: u32) -> Result<u32> {
        let ret = check(self.device().i2c_bitrate(bitrate_arg(khz)?))?;
        if khz != 0 {
            debug!("i2c bitrate {} kHz (requested {})", ret, khz);
        }
        self.session.config.i2c_bitrate_khz = ret;
        Ok(ret)
    }

    /// `i2c_bus_timeout` sets how long a stuck bus is tolerated. Zero leaves
    /// it unchanged and just reports it.
    pub fn i2c_bus_timeout(&mut self, timeout_ms: u16) -> Result<u16> {
        let ret = check(self.device().i2c_bus_timeout(timeout_ms))? as u16;
        self.session.config.i2c_bus_timeout_ms = ret;
        Ok(ret)
    }

    /// `i2c_free_bus` releases a bus left held by a `NO_STOP` transaction.
    pub fn i2c_free_bus(&mut self) -> Result<()> {
        check(self.device().i2c_free_bus())?;
        Ok(())
    }

    /// `i2c_write` writes the first `num_bytes` of `data` to the slave at
    /// `addr`, returning how many bytes the slave accepted.
    ///
    /// A write of at least one byte that nobody acknowledged fails with
    /// `Error::NoAcknowledge`, distinct from a transport failure.
    pub fn i2c_write(
        &mut self,
        addr: u16,
        flags: I2cFlags,
        num_bytes: usize,
        data: &[u8],
    ) -> Result<usize> {
        i2c::check_address(addr, flags)?;
        let n = frame::clamp(num_bytes, data.len());
        trace!("i2c write 0x{:02x} {:?} {:02x?}", addr, flags, &data[..n]);
        let ret = check(self.device().i2c_write(addr, flags.bits(), &data[..n]))?;
        let written = (ret as usize).min(n);
        if written == 0 && n > 0 {
            return Err(Error::NoAcknowledge { addr });
        }
        if written < n {
            warn!("i2c write to 0x{:02x}: {} of {} bytes accepted", addr, written, n);
        }
        Ok(written)
    }

    /// `i2c_read` reads up to `num_bytes` from the slave at `addr` into
    /// `data`. A count of zero means the slave did not respond.
    pub fn i2c_read(
        &mut self,
        addr: u16,
        flags: I2cFlags,
        num_bytes: usize,
        data: &mut [u8],
    ) -> Result<Transfer> {
        i2c::check_address(addr, flags)?;
        let n = frame::clamp(num_bytes, data.len());
        let ret = check(self.device().i2c_read(addr, flags.bits(), &mut data[..n]))?;
        let t = Transfer::new(n, ret);
        trace!("i2c read 0x{:02x}: {} of {} bytes", addr, t.actual, n);
        Ok(t)
    }

    /// `i2c_write_read` writes all of `out` and then, after a repeated
    /// start, reads `input.len()` bytes from the same slave.
    ///
    /// Returns the number of bytes written and the read transfer. The read
    /// is skipped when the write was not acknowledged.
    pub fn i2c_write_read(
        &mut self,
        addr: u16,
        flags: I2cFlags,
        out: &[u8],
        input: &mut [u8],
    ) -> Result<(usize, Transfer)> {
        let written = self.i2c_write(addr, flags | I2cFlags::NO_STOP, out.len(), out)?;
        let read = self.i2c_read(addr, flags - I2cFlags::NO_STOP, input.len(), input)?;
        Ok((written, read))
    }

    /// `i2c_write_ext` is `i2c_write` that also reports how the transaction
    /// ended on the bus. A refused address or data byte shows up in the
    /// status rather than as `Error::NoAcknowledge`.
    pub fn i2c_write_ext(
        &mut self,
        addr: u16,
        flags: I2cFlags,
        num_bytes: usize,
        data: &[u8],
    ) -> Result<(usize, I2cStatus)> {
        i2c::check_address(addr, flags)?;
        let n = frame::clamp(num_bytes, data.len());
        let (out, bits, mut count) = (&data[..n], flags.bits(), 0u16);
        let ret = self.device().i2c_write_ext(addr, bits, out, &mut count);
        let status = I2cStatus::from_raw(check(ret)?);
        let written = (count as usize).min(n);
        if !status.is_ok() {
            debug!("i2c write to 0x{:02x}: {:?} after {} bytes", addr, status, written);
        }
        Ok((written, status))
    }

    /// `i2c_read_ext` is `i2c_read` that also reports how the transaction
    /// ended on the bus.
    pub fn i2c_read_ext(
        &mut self,
        addr: u16,
        flags: I2cFlags,
        num_bytes: usize,
        data: &mut [u8],
    ) -> Result<(Transfer, I2cStatus)> {
        i2c::check_address(addr, flags)?;
        let n = frame::clamp(num_bytes, data.len());
        let (input, bits, mut count) = (&mut data[..n], flags.bits(), 0u16);
        let ret = self.device().i2c_read_ext(addr, bits, input, &mut count);
        let status = I2cStatus::from_raw(check(ret)?);
        let t = Transfer::new(n, count as u32);
        trace!("i2c read 0x{:02x}: {} of {} bytes, {:?}", addr, t.actual, n, status);
        Ok((t, status))
    }

    /// `i2c_slave_enable` makes the adapter answer as an I2C slave at
    /// `addr`. `max_tx` and `max_rx` limit the bytes sent to and accepted
    /// from an external master per transaction; zero means unlimited.
    pub fn i2c_slave_enable(&mut self, addr: u8, max_tx: u16, max_rx: u16) -> Result<()> {
        if addr as u16 > i2c::MAX_7BIT_ADDR {
            return Err(Error::Request("slave address out of range"));
        }
        check(self.device().i2c_slave_enable(addr, max_tx, max_rx))?;
        debug!("i2c slave enabled at 0x{:02x}", addr);
        self.session.config.i2c_slave = Some(addr);
        Ok(())
    }

    pub fn i2c_slave_disable(&mut self) -> Result<()> {
        check(self.device().i2c_slave_disable())?;
        debug!("i2c slave disabled");
        self.session.config.i2c_slave = None;
        self.drop_pending(AsyncEvent::I2cRead);
        self.drop_pending(AsyncEvent::I2cWrite);
        Ok(())
    }

    /// `i2c_slave_set_response` sets the bytes returned to an external
    /// master that reads from the adapter. At most 64 bytes are kept.
    pub fn i2c_slave_set_response(&mut self, num_bytes: usize, data: &[u8]) -> Result<usize> {
        let n = frame::clamp(num_bytes, data.len()).min(frame::MAX_SLAVE_RESPONSE);
        let ret = check(self.device().i2c_slave_set_response(&data[..n]))?;
        Ok((ret as usize).min(n))
    }

    /// `i2c_slave_write_stats` drains an `I2cWrite` event, returning how many
    /// bytes the external master read from the adapter.
    pub fn i2c_slave_write_stats(&mut self) -> Result<usize> {
        let ret = check(self.device().i2c_slave_write_stats());
        self.session.pending.drain(AsyncEvent::I2cWrite);
        Ok(ret? as usize)
    }

    /// `i2c_slave_read` drains an `I2cRead` event, copying what the external
    /// master wrote into `data`. Returns the address the master used.
    pub fn i2c_slave_read(&mut self, num_bytes: usize, data: &mut [u8]) -> Result<(u8, Transfer)> {
        let n = frame::clamp(num_bytes, data.len());
        let mut addr = 0u8;
        let ret = check(self.device().i2c_slave_read(&mut addr, &mut data[..n]));
        self.session.pending.drain(AsyncEvent::I2cRead);
        let t = Transfer::new(n, ret?);
        trace!("i2c slave read from master at 0x{:02x}: {} bytes", addr, t.actual);
        Ok((addr, t))
    }

    /// `i2c_slave_write_stats_ext` is `i2c_slave_write_stats` that also
    /// reports how the external master ended its read. `LastDataAck` means
    /// it acknowledged the final byte and wanted more.
    pub fn i2c_slave_write_stats_ext(&mut self) -> Result<(usize, I2cStatus)> {
        let mut count = 0u16;
        let ret = check(self.device().i2c_slave_write_stats_ext(&mut count));
        self.session.pending.drain(AsyncEvent::I2cWrite);
        Ok((count as usize, I2cStatus::from_raw(ret?)))
    }

    /// `i2c_slave_read_ext` is `i2c_slave_read` that also reports the bus
    /// status of the external master's write.
    pub fn i2c_slave_read_ext(
        &mut self,
        num_bytes: usize,
        data: &mut [u8],
    ) -> Result<(u8, Transfer, I2cStatus)> {
        let n = frame::clamp(num_bytes, data.len());
        let (input, mut addr, mut count) = (&mut data[..n], 0u8, 0u16);
        let device = self.device();
        let ret = device.i2c_slave_read_ext(&mut addr, input, &mut count);
        self.session.pending.drain(AsyncEvent::I2cRead);
        let status = I2cStatus::from_raw(check(ret)?);
        Ok((addr, Transfer::new(n, count as u32), status))
    }

    /// `i2c_monitor_enable` starts passive capture of the I2C bus. This
    /// suspends every other subsystem until the monitor is disabled.
    pub fn i2c_monitor_enable(&mut self) -> Result<()> {
        check(self.device().i2c_monitor_enable())?;
        debug!("i2c monitor enabled");
        self.session.decoder.reset();
        let config = &mut self.session.config;
        config.monitor = true;
        config.i2c_slave = None;
        config.spi_slave = false;
        self.session.pending.clear();
        Ok(())
    }

    pub fn i2c_monitor_disable(&mut self) -> Result<()> {
        check(self.device().i2c_monitor_disable())?;
        debug!("i2c monitor disabled");
        self.session.config.monitor = false;
        self.drop_pending(AsyncEvent::I2cMonitor);
        Ok(())
    }

    /// `i2c_monitor_read` drains an `I2cMonitor` event, copying raw monitor
    /// symbols into `data`.
    pub fn i2c_monitor_read(&mut self, num_symbols: usize, data: &mut [u16]) -> Result<Transfer> {
        let n = frame::clamp(num_symbols, data.len());
        let ret = check(self.device().i2c_monitor_read(&mut data[..n]));
        self.session.pending.drain(AsyncEvent::I2cMonitor);
        Ok(Transfer::new(n, ret?))
    }

    /// `i2c_monitor_events` drains an `I2cMonitor` event of up to
    /// `max_symbols` symbols and decodes them. The decoder keeps its place
    /// between calls, so a transaction split across reads decodes
    /// correctly.
    pub fn i2c_monitor_events(&mut self, max_symbols: usize) -> Result<Vec<MonitorEvent>> {
        let mut raw = vec![0u16; frame::clamp(max_symbols, frame::MAX_TRANSFER)];
        let t = self.i2c_monitor_read(raw.len(), &mut raw)?;
        Ok(self.session.decoder.decode(&raw[..t.actual]))
    }

    /// `spi_bitrate` sets the SPI clock in kilohertz and returns the rate
    /// the adapter actually applied. Zero leaves the rate unchanged and just
    /// reports it.
    pub fn spi_bitrate(&mut self, khz: u32) -> Result<u32> {
        let ret = check(self.device().spi_bitrate(bitrate_arg(khz)?))?;
        if khz != 0 {
            debug!("spi bitrate {} kHz (requested {})", ret, khz);
        }
        self.session.config.spi_bitrate_khz = ret;
        Ok(ret)
    }

    /// `spi_configure` sets the clock polarity, phase and bit order used in
    /// both master and slave mode.
    pub fn spi_configure(&mut self, config: spi::Config) -> Result<()> {
        let (polarity, phase, bit_order) = config.raw();
        check(self.device().spi_configure(polarity, phase, bit_order))?;
        debug!("spi mode {} {:?}", config.mode(), config.bit_order);
        self.session.config.spi = config;
        Ok(())
    }

    /// `spi_master_ss_polarity` sets the active level of SS in master mode.
    pub fn spi_master_ss_polarity(&mut self, polarity: spi::SsPolarity) -> Result<()> {
        check(self.device().spi_master_ss_polarity(polarity as u8))?;
        self.session.config.ss_polarity = polarity;
        Ok(())
    }

    /// `spi_write` performs one full-duplex SPI transaction, shifting out
    /// the first `out_bytes` of `data_out` while capturing up to `in_bytes`
    /// into `data_in`. The transaction is as long as the larger of the two;
    /// the shorter output is padded with zero bytes.
    pub fn spi_write(
        &mut self,
        out_bytes: usize,
        data_out: &[u8],
        in_bytes: usize,
        data_in: &mut [u8],
    ) -> Result<Transfer> {
        let n_out = frame::clamp(out_bytes, data_out.len());
        let n_in = frame::clamp(in_bytes, data_in.len());
        trace!("spi write {:02x?}", &data_out[..n_out]);
        let (out, input) = (&data_out[..n_out], &mut data_in[..n_in]);
        let ret = check(self.device().spi_write(out, input))?;
        let t = Transfer::new(n_in, ret);
        if !t.is_complete() {
            warn!("spi write: captured {} of {} bytes", t.actual, n_in);
        }
        Ok(t)
    }

    pub fn spi_slave_enable(&mut self) -> Result<()> {
        check(self.device().spi_slave_enable())?;
        debug!("spi slave enabled");
        self.session.config.spi_slave = true;
        Ok(())
    }

    pub fn spi_slave_disable(&mut self) -> Result<()> {
        check(self.device().spi_slave_disable())?;
        debug!("spi slave disabled");
        self.session.config.spi_slave = false;
        self.drop_pending(AsyncEvent::Spi);
        Ok(())
    }

    /// `spi_slave_set_response` sets the bytes shifted out to an external
    /// SPI master. At most 64 bytes are kept.
    pub fn spi_slave_set_response(&mut self, num_bytes: usize, data: &[u8]) -> Result<usize> {
        let n = frame::clamp(num_bytes, data.len()).min(frame::MAX_SLAVE_RESPONSE);
        let ret = check(self.device().spi_slave_set_response(&data[..n]))?;
        Ok((ret as usize).min(n))
    }

    /// `spi_slave_read` drains an `Spi` event, copying what the external
    /// master shifted in.
    pub fn spi_slave_read(&mut self, num_bytes: usize, data: &mut [u8]) -> Result<Transfer> {
        let n = frame::clamp(num_bytes, data.len());
        let ret = check(self.device().spi_slave_read(&mut data[..n]));
        self.session.pending.drain(AsyncEvent::Spi);
        Ok(Transfer::new(n, ret?))
    }

    /// `gpio_direction` selects which lines are outputs. The pullup mask is
    /// not affected and comes back into force for lines returned to input.
    pub fn gpio_direction(&mut self, outputs: GpioBits) -> Result<()> {
        check(self.device().gpio_direction(outputs.bits()))?;
        self.session.config.gpio_direction = outputs;
        Ok(())
    }

    /// `gpio_pullup` enables pullups on input lines. Bits for output lines
    /// are remembered for when the line becomes an input.
    pub fn gpio_pullup(&mut self, pullups: GpioBits) -> Result<()> {
        check(self.device().gpio_pullup(pullups.bits()))?;
        self.session.config.gpio_pullups = pullups;
        Ok(())
    }

    /// `gpio_get` samples the input lines. Bits of output lines are
    /// undefined.
    pub fn gpio_get(&mut self) -> Result<GpioBits> {
        let ret = check(self.device().gpio_get())?;
        Ok(GpioBits::from_bits_truncate(ret as u8))
    }

    /// `gpio_set` drives the output lines. Values for input lines are
    /// remembered for when the line becomes an output.
    pub fn gpio_set(&mut self, value: GpioBits) -> Result<()> {
        check(self.device().gpio_set(value.bits()))?;
        self.session.config.gpio_output = value;
        Ok(())
    }

    /// `gpio_change` waits until an input line changes or `timeout`
    /// elapses, then returns the input lines. The first call after a
    /// configuration change returns immediately.
    pub fn gpio_change(&mut self, timeout: Duration) -> Result<GpioBits> {
        let ms = timeout.as_millis();
        if ms > u16::MAX as u128 {
            return Err(Error::Request("gpio change timeout too long"));
        }
        let ret = check(self.device().gpio_change(ms as u16))?;
        Ok(GpioBits::from_bits_truncate(ret as u8))
    }

    /// `poll` waits for asynchronous data and reports what arrived.
    ///
    /// A reported event must be drained before polling again; until then
    /// every poll reports that same event without waiting.
    pub fn poll<T: Into<Timeout>>(&mut self, timeout: T) -> Result<AsyncEvent> {
        if let Some(event) = self.session.pending.undrained() {
            trace!("poll: {:?} still pending", event);
            return Ok(event);
        }
        let timeout = timeout.into();
        let mask = check(self.device().async_poll(timeout.raw()))?;
        let event = AsyncEvent::from_mask(mask);
        trace!("poll {:?}: {:?}", timeout, event);
        self.session.pending.report(event);
        Ok(event)
    }

    /// `try_event` is a non-blocking `poll` in the `nb` style, yielding
    /// `WouldBlock` while nothing is pending.
    pub fn try_event(&mut self) -> nb::Result<AsyncEvent, Error> {
        match self.poll(Timeout::NonBlocking) {
            Ok(AsyncEvent::NoData) => Err(nb::Error::WouldBlock),
            Ok(event) => Ok(event),
            Err(e) => Err(nb::Error::Other(e)),
        }
    }

    /// `next_slave_event` polls and drains one slave-mode event. Data written
    /// by an external master lands at the start of `buf`.
    ///
    /// Returns `None` when nothing arrived in time. Pending monitor data is
    /// not a slave event; it fails with `Error::Request` and stays pending
    /// for `i2c_monitor_read`.
    pub fn next_slave_event<T: Into<Timeout>>(
        &mut self,
        timeout: T,
        buf: &mut [u8],
    ) -> Result<Option<SlaveEvent>> {
        let event = match self.poll(timeout)? {
            AsyncEvent::NoData => return Ok(None),
            AsyncEvent::I2cRead => {
                let (addr, t) = self.i2c_slave_read(buf.len(), buf)?;
                SlaveEvent::MasterWrite {
                    addr,
                    len: t.actual,
                }
            }
            AsyncEvent::I2cWrite => SlaveEvent::MasterRead {
                len: self.i2c_slave_write_stats()?,
            },
            AsyncEvent::Spi => SlaveEvent::Spi {
                len: self.spi_slave_read(buf.len(), buf)?.actual,
            },
            AsyncEvent::I2cMonitor => return Err(Error::Request("monitor data pending")),
        };
        Ok(Some(event))
    }

    /// `next_monitor_events` polls for bus monitor data and decodes up to
    /// `max_symbols` symbols of it. Returns `None` when nothing arrived in
    /// time.
    pub fn next_monitor_events<T: Into<Timeout>>(
        &mut self,
        timeout: T,
        max_symbols: usize,
    ) -> Result<Option<Vec<MonitorEvent>>> {
        match self.poll(timeout)? {
            AsyncEvent::NoData => Ok(None),
            AsyncEvent::I2cMonitor => self.i2c_monitor_events(max_symbols).map(Some),
            _ => Err(Error::Request("slave data pending")),
        }
    }

    fn drop_pending(&mut self, kind: AsyncEvent) {
        self.session.pending.drain(kind);
    }
}
