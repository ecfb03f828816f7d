use aardvark::low::Device;
use aardvark::{Adapter, Error, I2cFlags, Status, Transfer};
use embedded_hal::blocking::i2c;

/// `AardvarkI2c` drives the adapter as an I2C master with 7-bit addressing.
///
/// Unlike the adapter's own API, a transfer that moves fewer bytes than
/// asked is an error here, since the HAL traits have no way to report a
/// partial result.
pub struct AardvarkI2c<'a, D: Device> {
    adapter: Adapter<'a, D>,
}

impl<'a, D: Device> AardvarkI2c<'a, D> {
    pub fn new(adapter: Adapter<'a, D>) -> Self {
        AardvarkI2c { adapter }
    }

    pub fn adapter(&mut self) -> &mut Adapter<'a, D> {
        &mut self.adapter
    }

    pub fn into_inner(self) -> Adapter<'a, D> {
        self.adapter
    }
}

fn expect_all_written(written: usize, len: usize) -> Result<(), Error> {
    if written < len {
        return Err(Error::Status(Status::I2cWriteError));
    }
    Ok(())
}

fn expect_all_read(addr: u8, t: Transfer) -> Result<(), Error> {
    if t.requested > 0 && t.is_empty() {
        return Err(Error::NoAcknowledge { addr: addr as u16 });
    }
    if !t.is_complete() {
        return Err(Error::Status(Status::I2cReadError));
    }
    Ok(())
}

impl<'a, D: Device> i2c::Write for AardvarkI2c<'a, D> {
    type Error = Error;

    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        let written = self
            .adapter
            .i2c_write(addr as u16, I2cFlags::empty(), bytes.len(), bytes)?;
        expect_all_written(written, bytes.len())
    }
}

impl<'a, D: Device> i2c::Read for AardvarkI2c<'a, D> {
    type Error = Error;

    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let t = self
            .adapter
            .i2c_read(addr as u16, I2cFlags::empty(), buffer.len(), buffer)?;
        expect_all_read(addr, t)
    }
}

impl<'a, D: Device> i2c::WriteRead for AardvarkI2c<'a, D> {
    type Error = Error;

    fn write_read(&mut self, addr: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error> {
        let (target, flags) = (u16::from(addr), I2cFlags::empty());
        let (written, t) = self.adapter.i2c_write_read(target, flags, bytes, buffer)?;
        expect_all_written(written, bytes.len())?;
        expect_all_read(addr, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aardvark::sim::{SimDriver, SimI2cMemory};
    use aardvark::Registry;
    use embedded_hal::blocking::i2c::{Read, Write, WriteRead};

    #[test]
    fn eeprom_through_hal_traits() {
        let mut driver = SimDriver::new();
        let port = driver.add_port(1);
        port.attach_i2c_memory(0x50, SimI2cMemory::at24c02());
        let mut registry = Registry::new(driver);
        let handle = registry.open(0).unwrap();
        let mut i2c = AardvarkI2c::new(registry.adapter(handle).unwrap());

        i2c.write(0x50, &[0x10, 1, 2, 3]).unwrap();
        let mut buf = [0u8; 3];
        i2c.write_read(0x50, &[0x10], &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);

        let mut next = [0u8; 1];
        i2c.read(0x50, &mut next).unwrap();
        assert_eq!(next, [0xff]);
    }

    #[test]
    fn absent_device_is_reported() {
        let mut driver = SimDriver::new();
        driver.add_port(1);
        let mut registry = Registry::new(driver);
        let handle = registry.open(0).unwrap();
        let mut i2c = AardvarkI2c::new(registry.adapter(handle).unwrap());

        assert_eq!(
            i2c.write(0x21, &[0]),
            Err(Error::NoAcknowledge { addr: 0x21 })
        );
        assert_eq!(
            i2c.read(0x21, &mut [0u8; 2]),
            Err(Error::NoAcknowledge { addr: 0x21 })
        );
    }
}
