//! Module `registry` tracks the adapter sessions opened through one driver.
//!
//! A session is identified by an `AdapterHandle`. Every operation looks the
//! handle up first, so a closed or unknown handle fails with
//! `Status::InvalidHandle` rather than reaching the driver.

use std::collections::BTreeMap;

use log::{debug, warn};
use once_cell::unsync::OnceCell;

use crate::adapter::Adapter;
use crate::config::ConfigState;
use crate::frame;
use crate::low::{Device, DeviceVersion, Driver, Versions};
use crate::monitor::MonitorDecoder;
use crate::peripherals::Features;
use crate::poll::Pending;
use crate::status::{check, Status};
use crate::Result;

/// `API_VERSION` is the driver API version this library implements.
pub const API_VERSION: u16 = 0x050a;

/// `REQ_SW_VERSION` is the oldest driver software this library accepts.
pub const REQ_SW_VERSION: u16 = 0x050a;

/// `PORT_NOT_FREE` marks a port that another session already holds.
pub const PORT_NOT_FREE: u16 = 0x8000;

/// `AdapterHandle` identifies an open session. Valid handles are always
/// positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AdapterHandle(i32);

impl AdapterHandle {
    /// `new` wraps a raw handle, rejecting zero and negative values (which
    /// the driver uses for status codes).
    pub fn new(raw: i32) -> Option<AdapterHandle> {
        if raw > 0 {
            Some(AdapterHandle(raw))
        } else {
            None
        }
    }

    pub fn raw(self) -> i32 {
        self.0
    }
}

/// `PortDescriptor` describes one attached adapter as reported by
/// `Registry::find_devices`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortDescriptor {
    /// Zero-based port number accepted by `Registry::open`.
    pub port: u16,
    /// Set when some session already holds the port.
    pub in_use: bool,
    /// The 10-digit serial number, when the driver reported one.
    pub unique_id: Option<u32>,
}

impl PortDescriptor {
    /// `from_raw` decodes a driver port word and unique id.
    pub fn from_raw(raw: u16, unique_id: u32) -> PortDescriptor {
        PortDescriptor {
            port: raw & !PORT_NOT_FREE,
            in_use: raw & PORT_NOT_FREE != 0,
            unique_id: if unique_id != 0 { Some(unique_id) } else { None },
        }
    }
}

/// `OpenInfo` is the extended information gathered by `Registry::open_ext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenInfo {
    pub versions: Versions,
    pub device: DeviceVersion,
    pub features: Features,
    pub unique_id: Option<u32>,
}

pub(crate) struct Session<D> {
    pub port: u16,
    pub device: D,
    pub features: Features,
    pub unique_id: u32,
    pub config: ConfigState,
    pub pending: Pending,
    pub decoder: MonitorDecoder,
}

/// `Registry` owns a driver and the sessions opened through it.
///
/// The driver's version is checked once, the first time the registry needs
/// the driver. An incompatible driver fails every later call with
/// `Status::IncompatibleLibrary` without being asked again. Dropping the
/// registry closes every session still open.
pub struct Registry<D: Driver> {
    driver: D,
    loaded: OnceCell<core::result::Result<Versions, Status>>,
    sessions: BTreeMap<AdapterHandle, Session<D::Device>>,
    next_handle: i32,
}

fn check_versions(v: Versions) -> core::result::Result<Versions, Status> {
    if v.software >= REQ_SW_VERSION && API_VERSION >= v.api_required {
        Ok(v)
    } else {
        Err(Status::IncompatibleLibrary)
    }
}

impl<D: Driver> Registry<D> {
    /// `Registry::new` takes ownership of a driver. No driver calls are made
    /// until the registry is first used.
    pub fn new(driver: D) -> Self {
        Registry {
            driver,
            loaded: OnceCell::new(),
            sessions: BTreeMap::new(),
            next_handle: 1,
        }
    }

    /// `versions` returns the driver's version matrix, performing the
    /// one-time compatibility check if it has not happened yet.
    pub fn versions(&self) -> Result<Versions> {
        let driver = &self.driver;
        let loaded = *self.loaded.get_or_init(|| {
            let v = driver.version();
            debug!(
                "driver software v{:x}.{:02x}, requires api v{:x}.{:02x}",
                v.software >> 8,
                v.software & 0xff,
                v.api_required >> 8,
                v.api_required & 0xff
            );
            check_versions(v)
        });
        Ok(loaded?)
    }

    /// `find_devices` lists every attached adapter.
    pub fn find_devices(&mut self) -> Result<Vec<PortDescriptor>> {
        self.versions()?;
        let attached = check(self.driver.find_devices(&mut [0u16; 0], &mut [0u32; 0]))? as usize;
        let mut ports = vec![0u16; attached];
        let mut ids = vec![0u32; attached];
        let found = check(self.driver.find_devices(&mut ports, &mut ids))? as usize;
        // Devices may come and go between the two calls.
        let n = frame::clamp(found, ports.len());
        Ok(ports[..n]
            .iter()
            .zip(&ids[..n])
            .map(|(&p, &id)| PortDescriptor::from_raw(p, id))
            .collect())
    }

    /// `open` claims the adapter on `port` and returns a handle for it.
    ///
    /// A port already held by a session of this registry cannot be opened
    /// again; the result is `Status::UnableToOpen`.
    pub fn open(&mut self, port: u16) -> Result<AdapterHandle> {
        self.open_ext(port).map(|(handle, _)| handle)
    }

    /// `open_ext` is `open` that also returns the version and feature
    /// information gathered while opening.
    pub fn open_ext(&mut self, port: u16) -> Result<(AdapterHandle, OpenInfo)> {
        let versions = self.versions()?;
        if self.sessions.values().any(|s| s.port == port) {
            return Err(Status::UnableToOpen.into());
        }
        let handle = AdapterHandle::new(self.next_handle).ok_or(Status::UnableToOpen)?;

        let mut device = self.driver.open(port)?;
        let opened = (|| {
            let features = Features::from_bits_truncate(check(device.features())?);
            let config = ConfigState::load(&mut device, features)?;
            Ok::<_, Status>((features, config))
        })();
        let (features, config) = match opened {
            Ok(v) => v,
            Err(e) => {
                device.close();
                return Err(e.into());
            }
        };
        let info = OpenInfo {
            versions,
            device: device.version(),
            features,
            unique_id: match device.unique_id() {
                0 => None,
                id => Some(id),
            },
        };

        self.next_handle = self.next_handle.checked_add(1).unwrap_or(0);
        debug!(
            "opened port {} as handle {}; features {:?}",
            port,
            handle.raw(),
            features
        );
        self.sessions.insert(
            handle,
            Session {
                port,
                device,
                features,
                unique_id: info.unique_id.unwrap_or(0),
                config,
                pending: Pending::default(),
                decoder: MonitorDecoder::new(),
            },
        );
        Ok((handle, info))
    }

    /// `close` ends a session. The handle is invalid afterwards.
    pub fn close(&mut self, handle: AdapterHandle) -> Result<()> {
        let mut session = self
            .sessions
            .remove(&handle)
            .ok_or(Status::InvalidHandle)?;
        debug!("closing handle {} on port {}", handle.raw(), session.port);
        check(session.device.close())?;
        Ok(())
    }

    /// `is_open` reports whether `handle` names a live session.
    pub fn is_open(&self, handle: AdapterHandle) -> bool {
        self.sessions.contains_key(&handle)
    }

    /// `len` is the number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn session(&self, handle: AdapterHandle) -> Result<&Session<D::Device>> {
        Ok(self.sessions.get(&handle).ok_or(Status::InvalidHandle)?)
    }

    /// `port` returns the port number a session was opened on.
    pub fn port(&self, handle: AdapterHandle) -> Result<u16> {
        Ok(self.session(handle)?.port)
    }

    /// `features` returns the subsystems the session's adapter supports.
    pub fn features(&self, handle: AdapterHandle) -> Result<Features> {
        Ok(self.session(handle)?.features)
    }

    /// `unique_id` returns the serial number of the session's adapter.
    pub fn unique_id(&self, handle: AdapterHandle) -> Result<Option<u32>> {
        let id = self.session(handle)?.unique_id;
        Ok(if id != 0 { Some(id) } else { None })
    }

    /// `adapter` borrows the session named by `handle` for bus operations.
    pub fn adapter(&mut self, handle: AdapterHandle) -> Result<Adapter<'_, D::Device>> {
        let session = self
            .sessions
            .get_mut(&handle)
            .ok_or(Status::InvalidHandle)?;
        Ok(Adapter::new(handle, session))
    }

    /// `driver` gives access to the wrapped driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }
}

impl<D: Driver> Drop for Registry<D> {
    fn drop(&mut self) {
        for (handle, mut session) in core::mem::take(&mut self.sessions) {
            debug!("closing handle {} on teardown", handle.raw());
            let ret = session.device.close();
            if ret < 0 {
                warn!(
                    "closing handle {} failed: {:?}",
                    handle.raw(),
                    Status::from_code(ret)
                );
            }
        }
    }
}
