use core::cell::RefCell;

use aardvark::low::Device;
use aardvark::{Adapter, Error, GpioBits};
use embedded_hal::digital::v2::{InputPin, OutputPin};

/// `AardvarkPins` shares one adapter between several single-line pins.
///
/// The adapter's bus mode must leave the lines in question to GPIO.
pub struct AardvarkPins<'a, D: Device> {
    adapter: RefCell<Adapter<'a, D>>,
}

impl<'a, D: Device> AardvarkPins<'a, D> {
    pub fn new(adapter: Adapter<'a, D>) -> Self {
        AardvarkPins {
            adapter: RefCell::new(adapter),
        }
    }

    pub fn into_inner(self) -> Adapter<'a, D> {
        self.adapter.into_inner()
    }

    /// `output` makes `line` an output and returns a pin driving it.
    pub fn output(&self, line: GpioBits) -> Result<AardvarkPin<'_, 'a, D>, Error> {
        let mut adapter = self.adapter.borrow_mut();
        let outputs = adapter.config().gpio_direction | line;
        adapter.gpio_direction(outputs)?;
        Ok(AardvarkPin { pins: self, line })
    }

    /// `input` makes `line` an input and returns a pin sampling it.
    pub fn input(&self, line: GpioBits) -> Result<AardvarkPin<'_, 'a, D>, Error> {
        let mut adapter = self.adapter.borrow_mut();
        let outputs = adapter.config().gpio_direction - line;
        adapter.gpio_direction(outputs)?;
        Ok(AardvarkPin { pins: self, line })
    }
}

/// `AardvarkPin` is one GPIO line of a shared adapter.
pub struct AardvarkPin<'p, 'a, D: Device> {
    pins: &'p AardvarkPins<'a, D>,
    line: GpioBits,
}

impl<'p, 'a, D: Device> AardvarkPin<'p, 'a, D> {
    pub fn line(&self) -> GpioBits {
        self.line
    }

    fn drive(&self, high: bool) -> Result<(), Error> {
        let mut adapter = self.pins.adapter.borrow_mut();
        let mut value = adapter.config().gpio_output;
        value.set(self.line, high);
        adapter.gpio_set(value)
    }
}

impl<'p, 'a, D: Device> OutputPin for AardvarkPin<'p, 'a, D> {
    type Error = Error;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

impl<'p, 'a, D: Device> InputPin for AardvarkPin<'p, 'a, D> {
    type Error = Error;

    fn is_high(&self) -> Result<bool, Self::Error> {
        let levels = self.pins.adapter.borrow_mut().gpio_get()?;
        Ok(levels.intersects(self.line))
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aardvark::sim::SimDriver;
    use aardvark::{BusMode, Registry};

    #[test]
    fn pins_share_one_adapter() {
        let mut driver = SimDriver::new();
        let port = driver.add_port(1);
        let mut registry = Registry::new(driver);
        let handle = registry.open(0).unwrap();
        let mut adapter = registry.adapter(handle).unwrap();
        adapter.configure(BusMode::GpioOnly).unwrap();

        let pins = AardvarkPins::new(adapter);
        let mut ss = pins.output(GpioBits::SS).unwrap();
        let mut sck = pins.output(GpioBits::SCK).unwrap();
        let miso = pins.input(GpioBits::MISO).unwrap();

        ss.set_high().unwrap();
        sck.set_high().unwrap();
        assert_eq!(port.gpio_outputs(), GpioBits::SS | GpioBits::SCK);
        ss.set_low().unwrap();
        assert_eq!(port.gpio_outputs(), GpioBits::SCK);

        port.set_gpio_inputs(GpioBits::empty());
        assert_eq!(miso.is_low(), Ok(true));
        port.set_gpio_inputs(GpioBits::MISO);
        assert_eq!(miso.is_high(), Ok(true));
    }
}
