//! Simulated serial EEPROM targets.

/// `next_in_page` advances `at` by one, wrapping back to the start of its
/// page at the page boundary.
fn next_in_page(at: usize, page_size: usize) -> usize {
    let base = at - at % page_size;
    base + (at + 1 - base) % page_size
}

/// `SimI2cMemory` behaves like a byte-addressed I2C EEPROM.
///
/// The first byte of each write sets the word pointer and later bytes are
/// stored from there, wrapping within the current page. Reads continue from
/// the pointer and wrap around the whole memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimI2cMemory {
    data: Vec<u8>,
    page_size: usize,
    pointer: usize,
}

impl SimI2cMemory {
    /// `new` creates an erased memory. `page_size` must divide `size`.
    pub fn new(size: usize, page_size: usize) -> SimI2cMemory {
        debug_assert!(page_size > 0 && size % page_size == 0);
        SimI2cMemory {
            data: vec![0xff; size],
            page_size,
            pointer: 0,
        }
    }

    /// `at24c02` is a 256-byte part with 8-byte pages.
    pub fn at24c02() -> SimI2cMemory {
        SimI2cMemory::new(256, 8)
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn write(&mut self, bytes: &[u8]) {
        let (first, rest) = match bytes.split_first() {
            Some(split) => split,
            None => return,
        };
        self.pointer = *first as usize % self.data.len();
        for &b in rest {
            self.data[self.pointer] = b;
            self.pointer = next_in_page(self.pointer, self.page_size);
        }
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.data[self.pointer];
            self.pointer = (self.pointer + 1) % self.data.len();
        }
    }
}

const WREN: u8 = 0x06;
const WRDI: u8 = 0x04;
const RDSR: u8 = 0x05;
const READ: u8 = 0x03;
const WRITE: u8 = 0x02;

const STATUS_WEL: u8 = 0x02;

/// `SimSpiMemory` behaves like a 16-bit addressed SPI EEPROM with a write
/// enable latch. Each write command consumes the latch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimSpiMemory {
    data: Vec<u8>,
    page_size: usize,
    write_enabled: bool,
}

impl SimSpiMemory {
    pub fn new(size: usize, page_size: usize) -> SimSpiMemory {
        debug_assert!(page_size > 0 && size % page_size == 0);
        SimSpiMemory {
            data: vec![0xff; size],
            page_size,
            write_enabled: false,
        }
    }

    /// `at25080a` is a 1 KiB part with 32-byte pages.
    pub fn at25080a() -> SimSpiMemory {
        SimSpiMemory::new(1024, 32)
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    fn address(&self, out: &[u8]) -> usize {
        let hi = out.get(1).copied().unwrap_or(0) as usize;
        let lo = out.get(2).copied().unwrap_or(0) as usize;
        ((hi << 8) | lo) % self.data.len()
    }

    /// `transfer` handles one chip-select cycle. `out` is what the master
    /// shifted out; the result is what the memory shifted back.
    pub(crate) fn transfer(&mut self, out: &[u8]) -> Vec<u8> {
        let mut back = vec![0xff; out.len()];
        match out.first().copied() {
            Some(WREN) => self.write_enabled = true,
            Some(WRDI) => self.write_enabled = false,
            Some(RDSR) => {
                if let Some(b) = back.get_mut(1) {
                    *b = if self.write_enabled { STATUS_WEL } else { 0 };
                }
            }
            Some(READ) => {
                let mut at = self.address(out);
                for b in back.iter_mut().skip(3) {
                    *b = self.data[at];
                    at = (at + 1) % self.data.len();
                }
            }
            Some(WRITE) if out.len() > 3 => {
                if self.write_enabled {
                    let mut at = self.address(out);
                    for &b in &out[3..] {
                        self.data[at] = b;
                        at = next_in_page(at, self.page_size);
                    }
                }
                self.write_enabled = false;
            }
            _ => {}
        }
        back
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i2c_write_wraps_within_page() {
        let mut m = SimI2cMemory::new(32, 8);
        m.write(&[6, 1, 2, 3, 4]);
        assert_eq!(&m.contents()[0..8], &[3, 4, 0xff, 0xff, 0xff, 0xff, 1, 2]);
    }

    #[test]
    fn odd_sized_pages_wrap_at_their_own_boundary() {
        let mut m = SimI2cMemory::new(48, 24);
        m.write(&[46, 1, 2, 3]);
        assert_eq!(&m.contents()[46..48], &[1, 2]);
        assert_eq!(m.contents()[24], 3);
        assert_eq!(m.contents()[0], 0xff);
    }

    #[test]
    fn i2c_read_continues_from_pointer() {
        let mut m = SimI2cMemory::new(16, 8);
        m.write(&[14, 0xaa, 0xbb]);
        m.write(&[15]);
        let mut buf = [0u8; 3];
        m.read(&mut buf);
        assert_eq!(buf, [0xbb, 0xff, 0xff]);
    }

    #[test]
    fn spi_write_requires_latch() {
        let mut m = SimSpiMemory::at25080a();
        m.transfer(&[WRITE, 0x00, 0x10, 0x55]);
        assert_eq!(m.contents()[0x10], 0xff);

        m.transfer(&[WREN]);
        assert_eq!(m.transfer(&[RDSR, 0])[1], STATUS_WEL);
        m.transfer(&[WRITE, 0x00, 0x10, 0x55]);
        assert_eq!(m.contents()[0x10], 0x55);
        assert_eq!(m.transfer(&[RDSR, 0])[1], 0);

        let back = m.transfer(&[READ, 0x00, 0x0f, 0, 0, 0]);
        assert_eq!(&back[3..], &[0xff, 0x55, 0xff]);
    }
}
