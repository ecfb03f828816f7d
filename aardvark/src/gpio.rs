//! Module `gpio` names the adapter lines available to the GPIO subsystem.
//!
//! Every GPIO call indexes the lines through one 8-bit mask. Direction
//! masks use 1 for output; pullup and value masks use 1 for enabled/high.
//! Writes to lines currently in the other direction are cached by the
//! adapter and take effect if the direction later changes.

bitflags::bitflags! {
    /// Bit positions of the adapter's I2C/SPI lines in the GPIO masks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GpioBits: u8 {
        const SCL = 0x01;
        const SDA = 0x02;
        const MISO = 0x04;
        const SCK = 0x08;
        const MOSI = 0x10;
        const SS = 0x20;
    }
}

impl GpioBits {
    /// `i2c` is the pair of lines claimed by the I2C subsystem.
    pub fn i2c() -> GpioBits {
        GpioBits::SCL | GpioBits::SDA
    }

    /// `spi` is the set of lines claimed by the SPI subsystem.
    pub fn spi() -> GpioBits {
        GpioBits::MISO | GpioBits::SCK | GpioBits::MOSI | GpioBits::SS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_groups_cover_all_lines() {
        assert_eq!(GpioBits::i2c() | GpioBits::spi(), GpioBits::all());
        assert!((GpioBits::i2c() & GpioBits::spi()).is_empty());
        assert_eq!(GpioBits::all().bits(), 0x3f);
    }
}
