//! Module `memory` drives common serial EEPROMs through an `Adapter`.
//!
//! These parts accept writes only within one page at a time and need a
//! moment to commit each page, so writes are split with `frame::pages` and
//! paced with a fixed delay after every chunk.

use std::thread;
use std::time::Duration;

use log::debug;

use crate::adapter::Adapter;
use crate::frame::{self, Transfer};
use crate::i2c::I2cFlags;
use crate::low::Device;
use crate::{Error, Result};

/// `DEFAULT_WRITE_DELAY` is how long a page write is given to commit.
pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_millis(10);

/// `I2cEeprom` is a byte-addressed I2C EEPROM such as the AT24C02.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cEeprom {
    pub addr: u16,
    pub page_size: usize,
    pub write_delay: Duration,
}

impl I2cEeprom {
    /// `at24c02` describes a 256-byte AT24C02 with 8-byte pages at `addr`.
    pub fn at24c02(addr: u16) -> I2cEeprom {
        I2cEeprom {
            addr,
            page_size: 8,
            write_delay: DEFAULT_WRITE_DELAY,
        }
    }

    pub fn with_write_delay(self, write_delay: Duration) -> I2cEeprom {
        I2cEeprom {
            write_delay,
            ..self
        }
    }

    /// `write` stores `data` starting at `offset`, one page at a time.
    /// Returns the number of data bytes the part accepted.
    pub fn write<D: Device>(
        &self,
        adapter: &mut Adapter<'_, D>,
        offset: u8,
        data: &[u8],
    ) -> Result<usize> {
        if self.page_size == 0 {
            return Err(Error::Request("page size must be non-zero"));
        }
        if offset as usize + data.len() > 0x100 {
            return Err(Error::Request("write runs past the end of memory"));
        }
        let mut written = 0;
        let mut chunk = Vec::with_capacity(self.page_size + 1);
        for page in frame::pages(offset as u32, data.len(), self.page_size) {
            chunk.clear();
            chunk.push(page.offset as u8);
            chunk.extend_from_slice(&data[page.data.clone()]);
            debug!(
                "eeprom 0x{:02x}: page write of {} bytes at 0x{:02x}",
                self.addr,
                page.data.len(),
                page.offset
            );
            let n = adapter.i2c_write(self.addr, I2cFlags::empty(), chunk.len(), &chunk)?;
            thread::sleep(self.write_delay);
            written += n.saturating_sub(1);
            if n < chunk.len() {
                break;
            }
        }
        Ok(written)
    }

    /// `read` fills `buf` with memory contents starting at `offset`.
    pub fn read<D: Device>(
        &self,
        adapter: &mut Adapter<'_, D>,
        offset: u8,
        buf: &mut [u8],
    ) -> Result<Transfer> {
        let (_, t) = adapter.i2c_write_read(self.addr, I2cFlags::empty(), &[offset], buf)?;
        Ok(t)
    }
}

const SPI_WREN: u8 = 0x06;
const SPI_WRITE: u8 = 0x02;
const SPI_READ: u8 = 0x03;
const SPI_HEADER: usize = 3;

/// `SpiEeprom` is a 16-bit addressed SPI EEPROM such as the AT25080A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiEeprom {
    pub size: usize,
    pub page_size: usize,
    pub write_delay: Duration,
}

impl SpiEeprom {
    /// `at25080a` describes a 1 KiB AT25080A with 32-byte pages.
    pub fn at25080a() -> SpiEeprom {
        SpiEeprom {
            size: 1024,
            page_size: 32,
            write_delay: DEFAULT_WRITE_DELAY,
        }
    }

    pub fn with_write_delay(self, write_delay: Duration) -> SpiEeprom {
        SpiEeprom {
            write_delay,
            ..self
        }
    }

    /// `write` stores `data` starting at `offset`, enabling writes before
    /// each page. Returns the number of data bytes shifted out.
    pub fn write<D: Device>(
        &self,
        adapter: &mut Adapter<'_, D>,
        offset: u16,
        data: &[u8],
    ) -> Result<usize> {
        if self.page_size == 0 {
            return Err(Error::Request("page size must be non-zero"));
        }
        if offset as usize + data.len() > self.size {
            return Err(Error::Request("write runs past the end of memory"));
        }
        let mut written = 0;
        let mut chunk = Vec::with_capacity(self.page_size + SPI_HEADER);
        for page in frame::pages(offset as u32, data.len(), self.page_size) {
            adapter.spi_write(1, &[SPI_WREN], 0, &mut [])?;

            chunk.clear();
            chunk.push(SPI_WRITE);
            chunk.extend_from_slice(&(page.offset as u16).to_be_bytes());
            chunk.extend_from_slice(&data[page.data.clone()]);
            debug!(
                "spi eeprom: page write of {} bytes at 0x{:03x}",
                page.data.len(),
                page.offset
            );
            adapter.spi_write(chunk.len(), &chunk, 0, &mut [])?;
            thread::sleep(self.write_delay);
            written += page.data.len();
        }
        Ok(written)
    }

    /// `read` fills `buf` with memory contents starting at `offset`, using a
    /// single transaction. `buf` may hold at most `MAX_TRANSFER - 3` bytes.
    pub fn read<D: Device>(
        &self,
        adapter: &mut Adapter<'_, D>,
        offset: u16,
        buf: &mut [u8],
    ) -> Result<Transfer> {
        let total = buf.len() + SPI_HEADER;
        if total > frame::MAX_TRANSFER {
            return Err(Error::Request("read too long for one transfer"));
        }
        let mut out = vec![0u8; total];
        out[0] = SPI_READ;
        out[1..SPI_HEADER].copy_from_slice(&offset.to_be_bytes());
        let mut input = vec![0u8; total];
        let t = adapter.spi_write(total, &out, total, &mut input)?;
        let n = t.actual.saturating_sub(SPI_HEADER);
        buf[..n].copy_from_slice(&input[SPI_HEADER..SPI_HEADER + n]);
        Ok(Transfer {
            requested: buf.len(),
            actual: n,
        })
    }
}
