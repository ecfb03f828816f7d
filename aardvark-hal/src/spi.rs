use aardvark::low::Device;
use aardvark::{Adapter, Error, Status};
use embedded_hal::blocking::spi;

/// `AardvarkSpi` drives the adapter as an SPI master. Each call is one
/// complete transaction with slave select asserted throughout.
pub struct AardvarkSpi<'a, D: Device> {
    adapter: Adapter<'a, D>,
}

impl<'a, D: Device> AardvarkSpi<'a, D> {
    pub fn new(adapter: Adapter<'a, D>) -> Self {
        AardvarkSpi { adapter }
    }

    pub fn into_inner(self) -> Adapter<'a, D> {
        self.adapter
    }
}

impl<'a, D: Device> spi::Transfer<u8> for AardvarkSpi<'a, D> {
    type Error = Error;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
        let out = words.to_vec();
        let n = out.len();
        let t = self.adapter.spi_write(n, &out, n, words)?;
        if !t.is_complete() {
            return Err(Error::Status(Status::SpiWriteError));
        }
        Ok(words)
    }
}

impl<'a, D: Device> spi::Write<u8> for AardvarkSpi<'a, D> {
    type Error = Error;

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let n = words.len();
        self.adapter.spi_write(n, words, 0, &mut [])?;
        Ok(())
    }
}
