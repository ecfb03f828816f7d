//! Module `sim` is an in-process adapter that implements the `low` traits
//! without any hardware.
//!
//! Each simulated port is shared between the session that has it open and
//! any number of `SimPort` handles held by a test or application. Those
//! play the part of the outside world: they attach targets to the bus,
//! act as an external master towards the adapter's slave modes, drive
//! monitor traffic and GPIO input levels, and inspect what the adapter
//! put on the bus. A `SimPort` may be moved to another thread to wake a
//! session blocked in `poll` or `gpio_change`.

mod memory;

pub use self::memory::{SimI2cMemory, SimSpiMemory};

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::gpio::GpioBits;
use crate::i2c::I2cStatus;
use crate::low::{Device, DeviceVersion, Driver, Versions};
use crate::peripherals::Features;
use crate::registry::PORT_NOT_FREE;
use crate::status::Status;

const I2C_BITRATE_MAX: i32 = 800;
const SPI_BITRATES: [i32; 7] = [125, 250, 500, 1000, 2000, 4000, 8000];
const MAX_RESPONSE: usize = 64;

const CONFIG_QUERY: u8 = 0x80;
const CONFIG_SPI: u8 = 0x01;
const CONFIG_I2C: u8 = 0x02;
const MASK_QUERY: u8 = 0x80;
const FLAG_NO_STOP: u8 = 0x04;
const GPIO_LINES: u8 = 0x3f;

/// `BusOp` is one master transaction the adapter put on a bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    I2cWrite { addr: u16, data: Vec<u8>, stop: bool },
    I2cRead { addr: u16, len: usize },
    /// The bytes shifted out, padded to the full transaction length.
    SpiWrite { data: Vec<u8> },
}

#[derive(Debug, Clone, Copy)]
struct SlaveSetup {
    addr: u8,
    max_tx: u16,
    max_rx: u16,
}

#[derive(Debug)]
struct PortState {
    unique_id: u32,
    features: Features,
    open: bool,

    mode: u8,
    power: u8,
    pullups: u8,
    i2c_khz: i32,
    bus_timeout_ms: u16,
    spi_khz: i32,
    bus_held: bool,
    i2c_fault: Option<I2cStatus>,

    i2c_targets: BTreeMap<u16, SimI2cMemory>,
    spi_memory: Option<SimSpiMemory>,

    i2c_slave: Option<SlaveSetup>,
    i2c_response: Vec<u8>,
    i2c_received: VecDeque<(u8, Vec<u8>)>,
    /// Bytes sent per external read, and whether the master wanted more.
    i2c_sent: VecDeque<(usize, bool)>,

    spi_slave: bool,
    spi_response: Vec<u8>,
    spi_received: VecDeque<Vec<u8>>,

    monitor: bool,
    monitor_symbols: VecDeque<u16>,

    gpio_direction: u8,
    gpio_output: u8,
    gpio_inputs: u8,
    gpio_reconfigured: bool,

    log: Vec<BusOp>,
}

impl PortState {
    fn new(unique_id: u32) -> PortState {
        PortState {
            unique_id,
            features: Features::SPI | Features::I2C | Features::GPIO | Features::I2C_MONITOR,
            open: false,
            mode: CONFIG_SPI | CONFIG_I2C,
            power: 0,
            pullups: 0,
            i2c_khz: 100,
            bus_timeout_ms: 200,
            spi_khz: 1000,
            bus_held: false,
            i2c_fault: None,
            i2c_targets: BTreeMap::new(),
            spi_memory: None,
            i2c_slave: None,
            i2c_response: Vec::new(),
            i2c_received: VecDeque::new(),
            i2c_sent: VecDeque::new(),
            spi_slave: false,
            spi_response: Vec::new(),
            spi_received: VecDeque::new(),
            monitor: false,
            monitor_symbols: VecDeque::new(),
            gpio_direction: 0,
            gpio_output: 0,
            gpio_inputs: GPIO_LINES,
            gpio_reconfigured: false,
            log: Vec::new(),
        }
    }

    fn stop_slaves(&mut self) {
        self.i2c_slave = None;
        self.i2c_received.clear();
        self.i2c_sent.clear();
        self.spi_slave = false;
        self.spi_received.clear();
    }

    fn i2c(&self) -> Result<(), Status> {
        if !self.features.contains(Features::I2C) {
            Err(Status::I2cNotAvailable)
        } else if self.mode & CONFIG_I2C == 0 || self.monitor {
            Err(Status::I2cNotEnabled)
        } else {
            Ok(())
        }
    }

    /// `bus_read` runs one master read against the attached targets.
    fn bus_read(
        &mut self,
        addr: u16,
        flags: u8,
        data: &mut [u8],
    ) -> Result<(usize, I2cStatus), Status> {
        self.i2c()?;
        self.log.push(BusOp::I2cRead {
            addr,
            len: data.len(),
        });
        if let Some(fault) = self.i2c_fault.take() {
            self.bus_held = false;
            return Ok((0, fault));
        }
        match self.i2c_targets.get_mut(&addr) {
            Some(target) => {
                target.read(data);
                self.bus_held = flags & FLAG_NO_STOP != 0;
                Ok((data.len(), I2cStatus::Ok))
            }
            None => {
                self.bus_held = false;
                Ok((0, I2cStatus::SlaNack))
            }
        }
    }

    fn bus_write(
        &mut self,
        addr: u16,
        flags: u8,
        data: &[u8],
    ) -> Result<(usize, I2cStatus), Status> {
        self.i2c()?;
        let no_stop = flags & FLAG_NO_STOP != 0;
        self.log.push(BusOp::I2cWrite {
            addr,
            data: data.to_vec(),
            stop: !no_stop,
        });
        if let Some(fault) = self.i2c_fault.take() {
            self.bus_held = false;
            return Ok((0, fault));
        }
        match self.i2c_targets.get_mut(&addr) {
            Some(target) => {
                target.write(data);
                self.bus_held = no_stop;
                Ok((data.len(), I2cStatus::Ok))
            }
            None => {
                self.bus_held = false;
                Ok((0, I2cStatus::SlaNack))
            }
        }
    }

    /// `slave_take` hands over the oldest write an external master made to
    /// the adapter's slave, truncated to `data`.
    fn slave_take(&mut self, data: &mut [u8]) -> Result<(u8, usize), Status> {
        self.i2c()?;
        let (from, bytes) = self.i2c_received.pop_front().ok_or(Status::I2cSlaveTimeout)?;
        let n = bytes.len().min(data.len());
        data[..n].copy_from_slice(&bytes[..n]);
        Ok((from, n))
    }

    fn spi(&self) -> Result<(), Status> {
        if !self.features.contains(Features::SPI) {
            Err(Status::SpiNotAvailable)
        } else if self.mode & CONFIG_SPI == 0 || self.monitor {
            Err(Status::SpiNotEnabled)
        } else {
            Ok(())
        }
    }

    fn gpio(&self) -> Result<(), Status> {
        if self.features.contains(Features::GPIO) {
            Ok(())
        } else {
            Err(Status::GpioNotAvailable)
        }
    }

    fn monitor_available(&self) -> Result<(), Status> {
        if self.features.contains(Features::I2C_MONITOR) {
            Ok(())
        } else {
            Err(Status::I2cMonitorNotAvailable)
        }
    }

    fn async_mask(&self) -> i32 {
        let mut mask = 0;
        if !self.i2c_received.is_empty() {
            mask |= 0x01;
        }
        if !self.i2c_sent.is_empty() {
            mask |= 0x02;
        }
        if !self.spi_received.is_empty() {
            mask |= 0x04;
        }
        if !self.monitor_symbols.is_empty() {
            mask |= 0x08;
        }
        mask
    }

    fn gpio_level(&self) -> i32 {
        let inputs = self.gpio_inputs & !self.gpio_direction;
        (inputs | (self.gpio_output & self.gpio_direction)) as i32
    }
}

fn respond(response: &[u8], len: usize) -> Vec<u8> {
    if response.is_empty() {
        vec![0xff; len]
    } else {
        response.iter().copied().cycle().take(len).collect()
    }
}

struct Shared {
    state: Mutex<PortState>,
    changed: Condvar,
}

/// `SimPort` is the outside world's view of one simulated adapter.
#[derive(Clone)]
pub struct SimPort {
    shared: Arc<Shared>,
}

impl SimPort {
    fn new(unique_id: u32) -> SimPort {
        SimPort {
            shared: Arc::new(Shared {
                state: Mutex::new(PortState::new(unique_id)),
                changed: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PortState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn update<T>(&self, f: impl FnOnce(&mut PortState) -> T) -> T {
        let mut st = self.lock();
        let ret = f(&mut *st);
        drop(st);
        self.shared.changed.notify_all();
        ret
    }

    pub fn unique_id(&self) -> u32 {
        self.lock().unique_id
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// `set_features` changes which subsystems the adapter claims to have.
    pub fn set_features(&self, features: Features) {
        self.lock().features = features;
    }

    /// `attach_i2c_memory` puts an EEPROM on the I2C bus at `addr`.
    pub fn attach_i2c_memory(&self, addr: u16, memory: SimI2cMemory) {
        self.lock().i2c_targets.insert(addr, memory);
    }

    /// `i2c_memory` returns a snapshot of the EEPROM at `addr`.
    pub fn i2c_memory(&self, addr: u16) -> Option<SimI2cMemory> {
        self.lock().i2c_targets.get(&addr).cloned()
    }

    /// `fail_next_i2c` makes the next master transaction end with `status`
    /// before any byte is moved, as if the bus misbehaved.
    pub fn fail_next_i2c(&self, status: I2cStatus) {
        self.lock().i2c_fault = Some(status);
    }

    /// `attach_spi_memory` puts an EEPROM on the SPI bus.
    pub fn attach_spi_memory(&self, memory: SimSpiMemory) {
        self.lock().spi_memory = Some(memory);
    }

    pub fn spi_memory_contents(&self) -> Option<Vec<u8>> {
        self.lock().spi_memory.as_ref().map(|m| m.contents().to_vec())
    }

    /// `master_write` acts as an external I2C master writing `data` to
    /// `addr`. Returns false when the adapter is not a slave at `addr`.
    pub fn master_write(&self, addr: u8, data: &[u8]) -> bool {
        self.update(|st| match st.i2c_slave {
            Some(slave) if slave.addr == addr => {
                let mut data = data.to_vec();
                if slave.max_rx != 0 {
                    data.truncate(slave.max_rx as usize);
                }
                st.i2c_received.push_back((addr, data));
                true
            }
            _ => false,
        })
    }

    /// `master_read` acts as an external I2C master reading `len` bytes from
    /// the adapter's slave response. Returns `None` when slave mode is off.
    pub fn master_read(&self, len: usize) -> Option<Vec<u8>> {
        self.update(|st| {
            let slave = st.i2c_slave?;
            let wanted = len;
            let len = if slave.max_tx != 0 {
                len.min(slave.max_tx as usize)
            } else {
                len
            };
            st.i2c_sent.push_back((len, len < wanted));
            Some(respond(&st.i2c_response, len))
        })
    }

    /// `spi_master_transfer` acts as an external SPI master. Returns what the
    /// adapter shifted back, or `None` when SPI slave mode is off.
    pub fn spi_master_transfer(&self, data: &[u8]) -> Option<Vec<u8>> {
        self.update(|st| {
            if !st.spi_slave {
                return None;
            }
            st.spi_received.push_back(data.to_vec());
            Some(respond(&st.spi_response, data.len()))
        })
    }

    /// `monitor_capture` delivers raw symbols to the bus monitor. They are
    /// dropped when the monitor is off.
    pub fn monitor_capture(&self, symbols: &[u16]) -> bool {
        self.update(|st| {
            if st.monitor {
                st.monitor_symbols.extend(symbols.iter().copied());
            }
            st.monitor
        })
    }

    /// `set_gpio_inputs` sets the levels seen on the adapter's input lines.
    pub fn set_gpio_inputs(&self, levels: GpioBits) {
        self.update(|st| st.gpio_inputs = levels.bits())
    }

    /// `gpio_outputs` returns the levels the adapter drives on its output
    /// lines.
    pub fn gpio_outputs(&self) -> GpioBits {
        let st = self.lock();
        GpioBits::from_bits_truncate(st.gpio_output & st.gpio_direction)
    }

    pub fn bus_log(&self) -> Vec<BusOp> {
        self.lock().log.clone()
    }

    pub fn clear_bus_log(&self) {
        self.lock().log.clear();
    }
}

/// `SimDriver` is a driver whose ports are `SimPort`s.
pub struct SimDriver {
    ports: Vec<SimPort>,
    versions: Versions,
}

impl Default for SimDriver {
    fn default() -> Self {
        SimDriver::new()
    }
}

impl SimDriver {
    pub fn new() -> SimDriver {
        SimDriver::with_versions(Versions {
            software: 0x051e,
            api_required: 0x0500,
        })
    }

    /// `with_versions` creates a driver reporting the given versions, for
    /// exercising the compatibility check.
    pub fn with_versions(versions: Versions) -> SimDriver {
        SimDriver {
            ports: Vec::new(),
            versions,
        }
    }

    /// `add_port` attaches a new adapter on the next free port number.
    pub fn add_port(&mut self, unique_id: u32) -> SimPort {
        let port = SimPort::new(unique_id);
        self.ports.push(port.clone());
        port
    }

    pub fn port(&self, port: u16) -> Option<SimPort> {
        self.ports.get(port as usize).cloned()
    }
}

impl Driver for SimDriver {
    type Device = SimDevice;

    fn version(&self) -> Versions {
        self.versions
    }

    fn find_devices(&mut self, devices: &mut [u16], unique_ids: &mut [u32]) -> i32 {
        for (i, port) in self.ports.iter().enumerate() {
            let st = port.lock();
            if let Some(d) = devices.get_mut(i) {
                *d = i as u16 | if st.open { PORT_NOT_FREE } else { 0 };
            }
            if let Some(id) = unique_ids.get_mut(i) {
                *id = st.unique_id;
            }
        }
        self.ports.len() as i32
    }

    fn open(&mut self, port: u16) -> Result<SimDevice, Status> {
        let sim = self.ports.get(port as usize).ok_or(Status::UnableToOpen)?;
        let mut st = sim.lock();
        if st.open {
            return Err(Status::UnableToOpen);
        }
        st.open = true;
        st.bus_held = false;
        st.gpio_reconfigured = false;
        Ok(SimDevice { port: sim.clone() })
    }
}

/// `SimDevice` is an open session on a `SimPort`.
pub struct SimDevice {
    port: SimPort,
}

impl SimDevice {
    fn call(&self, f: impl FnOnce(&mut PortState) -> Result<i32, Status>) -> i32 {
        self.port.update(f).unwrap_or_else(Status::code)
    }
}

impl Device for SimDevice {
    fn close(&mut self) -> i32 {
        self.call(|st| {
            if !st.open {
                return Err(Status::UnableToClose);
            }
            st.open = false;
            st.monitor = false;
            st.monitor_symbols.clear();
            st.stop_slaves();
            Ok(0)
        })
    }

    fn features(&mut self) -> i32 {
        self.port.lock().features.bits() as i32
    }

    fn unique_id(&mut self) -> u32 {
        self.port.lock().unique_id
    }

    fn version(&mut self) -> DeviceVersion {
        DeviceVersion {
            firmware: 0x0300,
            hardware: 0x0300,
        }
    }

    fn configure(&mut self, config: u8) -> i32 {
        self.call(|st| {
            if config & CONFIG_QUERY != 0 {
                return Ok(st.mode as i32);
            }
            let mut mode = config & (CONFIG_SPI | CONFIG_I2C);
            if !st.features.contains(Features::SPI) {
                mode &= !CONFIG_SPI;
            }
            if !st.features.contains(Features::I2C) {
                mode &= !CONFIG_I2C;
            }
            st.mode = mode;
            st.gpio_reconfigured = true;
            Ok(mode as i32)
        })
    }

    fn target_power(&mut self, mask: u8) -> i32 {
        self.call(|st| {
            if mask != MASK_QUERY {
                st.power = mask & 0x03;
            }
            Ok(st.power as i32)
        })
    }

    fn async_poll(&mut self, timeout_ms: i32) -> i32 {
        let shared = &self.port.shared;
        let mut st = self.port.lock();
        let deadline = if timeout_ms > 0 {
            Some(Instant::now() + Duration::from_millis(timeout_ms as u64))
        } else {
            None
        };
        loop {
            let mask = st.async_mask();
            if mask != 0 || timeout_ms == 0 {
                return mask;
            }
            st = match deadline {
                None => shared
                    .changed
                    .wait(st)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return 0;
                    }
                    shared
                        .changed
                        .wait_timeout(st, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    fn i2c_free_bus(&mut self) -> i32 {
        self.call(|st| {
            st.i2c()?;
            if !st.bus_held {
                return Err(Status::I2cBusAlreadyFree);
            }
            st.bus_held = false;
            Ok(0)
        })
    }

    fn i2c_bitrate(&mut self, khz: i32) -> i32 {
        self.call(|st| {
            if !st.features.contains(Features::I2C) {
                return Err(Status::I2cNotAvailable);
            }
            if khz > 0 {
                st.i2c_khz = khz.min(I2C_BITRATE_MAX);
            }
            Ok(st.i2c_khz)
        })
    }

    fn i2c_bus_timeout(&mut self, timeout_ms: u16) -> i32 {
        self.call(|st| {
            if !st.features.contains(Features::I2C) {
                return Err(Status::I2cNotAvailable);
            }
            if timeout_ms > 0 {
                st.bus_timeout_ms = timeout_ms;
            }
            Ok(st.bus_timeout_ms as i32)
        })
    }

    fn i2c_pullup(&mut self, mask: u8) -> i32 {
        self.call(|st| {
            if !st.features.contains(Features::I2C) {
                return Err(Status::I2cNotAvailable);
            }
            if mask != MASK_QUERY {
                st.pullups = mask & 0x03;
            }
            Ok(st.pullups as i32)
        })
    }

    fn i2c_read(&mut self, addr: u16, flags: u8, data: &mut [u8]) -> i32 {
        self.call(|st| Ok(st.bus_read(addr, flags, data)?.0 as i32))
    }

    fn i2c_write(&mut self, addr: u16, flags: u8, data: &[u8]) -> i32 {
        self.call(|st| Ok(st.bus_write(addr, flags, data)?.0 as i32))
    }

    fn i2c_read_ext(&mut self, addr: u16, flags: u8, data: &mut [u8], num_read: &mut u16) -> i32 {
        self.call(|st| {
            let (n, status) = st.bus_read(addr, flags, data)?;
            *num_read = n as u16;
            Ok(status as i32)
        })
    }

    fn i2c_write_ext(&mut self, addr: u16, flags: u8, data: &[u8], num_written: &mut u16) -> i32 {
        self.call(|st| {
            let (n, status) = st.bus_write(addr, flags, data)?;
            *num_written = n as u16;
            Ok(status as i32)
        })
    }

    fn i2c_slave_enable(&mut self, addr: u8, max_tx: u16, max_rx: u16) -> i32 {
        self.call(|st| {
            st.i2c()?;
            if addr > 0x7f {
                return Err(Status::I2cSlaveBadConfig);
            }
            st.i2c_slave = Some(SlaveSetup {
                addr,
                max_tx,
                max_rx,
            });
            Ok(0)
        })
    }

    fn i2c_slave_disable(&mut self) -> i32 {
        self.call(|st| {
            st.i2c()?;
            st.i2c_slave = None;
            st.i2c_received.clear();
            st.i2c_sent.clear();
            Ok(0)
        })
    }

    fn i2c_slave_set_response(&mut self, data: &[u8]) -> i32 {
        self.call(|st| {
            st.i2c()?;
            let n = data.len().min(MAX_RESPONSE);
            st.i2c_response = data[..n].to_vec();
            Ok(n as i32)
        })
    }

    fn i2c_slave_write_stats(&mut self) -> i32 {
        self.call(|st| {
            st.i2c()?;
            let (n, _) = st.i2c_sent.pop_front().ok_or(Status::I2cSlaveTimeout)?;
            Ok(n as i32)
        })
    }

    fn i2c_slave_write_stats_ext(&mut self, num_written: &mut u16) -> i32 {
        self.call(|st| {
            st.i2c()?;
            let (n, wanted_more) = st.i2c_sent.pop_front().ok_or(Status::I2cSlaveTimeout)?;
            *num_written = n as u16;
            let status = if wanted_more {
                I2cStatus::LastDataAck
            } else {
                I2cStatus::Ok
            };
            Ok(status as i32)
        })
    }

    fn i2c_slave_read(&mut self, addr: &mut u8, data: &mut [u8]) -> i32 {
        self.call(|st| {
            let (from, n) = st.slave_take(data)?;
            *addr = from;
            Ok(n as i32)
        })
    }

    fn i2c_slave_read_ext(&mut self, addr: &mut u8, data: &mut [u8], num_read: &mut u16) -> i32 {
        self.call(|st| {
            let (from, n) = st.slave_take(data)?;
            *addr = from;
            *num_read = n as u16;
            Ok(I2cStatus::Ok as i32)
        })
    }

    fn i2c_monitor_enable(&mut self) -> i32 {
        self.call(|st| {
            st.monitor_available()?;
            if st.mode & CONFIG_I2C == 0 {
                return Err(Status::I2cNotEnabled);
            }
            st.stop_slaves();
            st.monitor = true;
            st.monitor_symbols.clear();
            Ok(0)
        })
    }

    fn i2c_monitor_disable(&mut self) -> i32 {
        self.call(|st| {
            st.monitor_available()?;
            if !st.monitor {
                return Err(Status::I2cMonitorNotEnabled);
            }
            st.monitor = false;
            st.monitor_symbols.clear();
            Ok(0)
        })
    }

    fn i2c_monitor_read(&mut self, data: &mut [u16]) -> i32 {
        self.call(|st| {
            st.monitor_available()?;
            if !st.monitor {
                return Err(Status::I2cMonitorNotEnabled);
            }
            let n = data.len().min(st.monitor_symbols.len());
            for (slot, sym) in data.iter_mut().zip(st.monitor_symbols.drain(..n)) {
                *slot = sym;
            }
            Ok(n as i32)
        })
    }

    fn spi_bitrate(&mut self, khz: i32) -> i32 {
        self.call(|st| {
            if !st.features.contains(Features::SPI) {
                return Err(Status::SpiNotAvailable);
            }
            if khz > 0 {
                st.spi_khz = SPI_BITRATES
                    .iter()
                    .rev()
                    .copied()
                    .find(|&rate| rate <= khz)
                    .unwrap_or(SPI_BITRATES[0]);
            }
            Ok(st.spi_khz)
        })
    }

    fn spi_configure(&mut self, _polarity: u8, _phase: u8, _bit_order: u8) -> i32 {
        self.call(|st| {
            st.spi()?;
            Ok(0)
        })
    }

    fn spi_master_ss_polarity(&mut self, _polarity: u8) -> i32 {
        self.call(|st| {
            st.spi()?;
            Ok(0)
        })
    }

    fn spi_write(&mut self, data_out: &[u8], data_in: &mut [u8]) -> i32 {
        self.call(|st| {
            st.spi()?;
            let mut out = data_out.to_vec();
            out.resize(data_out.len().max(data_in.len()), 0);
            let back = match st.spi_memory.as_mut() {
                Some(memory) => memory.transfer(&out),
                None => vec![0xff; out.len()],
            };
            st.log.push(BusOp::SpiWrite { data: out });
            data_in.copy_from_slice(&back[..data_in.len()]);
            Ok(data_in.len() as i32)
        })
    }

    fn spi_slave_enable(&mut self) -> i32 {
        self.call(|st| {
            st.spi()?;
            st.spi_slave = true;
            Ok(0)
        })
    }

    fn spi_slave_disable(&mut self) -> i32 {
        self.call(|st| {
            st.spi()?;
            st.spi_slave = false;
            st.spi_received.clear();
            Ok(0)
        })
    }

    fn spi_slave_set_response(&mut self, data: &[u8]) -> i32 {
        self.call(|st| {
            st.spi()?;
            let n = data.len().min(MAX_RESPONSE);
            st.spi_response = data[..n].to_vec();
            Ok(n as i32)
        })
    }

    fn spi_slave_read(&mut self, data: &mut [u8]) -> i32 {
        self.call(|st| {
            st.spi()?;
            let bytes = st.spi_received.pop_front().ok_or(Status::SpiSlaveTimeout)?;
            let n = bytes.len().min(data.len());
            data[..n].copy_from_slice(&bytes[..n]);
            Ok(n as i32)
        })
    }

    fn gpio_direction(&mut self, mask: u8) -> i32 {
        self.call(|st| {
            st.gpio()?;
            st.gpio_direction = mask & GPIO_LINES;
            st.gpio_reconfigured = true;
            Ok(0)
        })
    }

    fn gpio_pullup(&mut self, _mask: u8) -> i32 {
        self.call(|st| {
            st.gpio()?;
            st.gpio_reconfigured = true;
            Ok(0)
        })
    }

    fn gpio_get(&mut self) -> i32 {
        self.call(|st| {
            st.gpio()?;
            Ok(st.gpio_level())
        })
    }

    fn gpio_set(&mut self, value: u8) -> i32 {
        self.call(|st| {
            st.gpio()?;
            st.gpio_output = value & GPIO_LINES;
            Ok(0)
        })
    }

    fn gpio_change(&mut self, timeout_ms: u16) -> i32 {
        let shared = &self.port.shared;
        let mut st = self.port.lock();
        if let Err(e) = st.gpio() {
            return e.code();
        }
        if st.gpio_reconfigured {
            st.gpio_reconfigured = false;
            return st.gpio_level();
        }
        let start = st.gpio_inputs;
        let (st, _) = shared
            .changed
            .wait_timeout_while(st, Duration::from_millis(timeout_ms as u64), |st| {
                st.gpio_inputs == start
            })
            .unwrap_or_else(PoisonError::into_inner);
        st.gpio_level()
    }
}
