//! `embedded-hal` implementations via an Aardvark-style adapter
//!
//! [`embedded-hal`](https://crates.io/crates/embedded-hal) is a hardware
//! abstraction layer for embedded systems. It is most commonly used in
//! applications destined to run on microcontrollers or other small computing
//! devices embedded inside products.
//!
//! This library contains implementations of the blocking I2C and SPI traits
//! and the digital pin traits in terms of an I2C/SPI/GPIO USB adapter, thus
//! allowing a HAL device driver to interact with its corresponding hardware
//! from a general-purpose computer using the adapter as an intermediary.
//!
//! All of the trait implementations in this library wrap an open
//! `aardvark::Adapter` whose bus mode already enables the subsystem in
//! question.

extern crate embedded_hal;

pub mod gpio;
pub mod i2c;
pub mod spi;

pub use gpio::{AardvarkPin, AardvarkPins};
pub use i2c::AardvarkI2c;
pub use spi::AardvarkSpi;
