use std::thread;
use std::time::Duration;

use aardvark::sim::{SimDriver, SimPort};
use aardvark::{
    AsyncEvent, BusMode, Error, GpioBits, I2cFlags, MonitorEvent, Registry, Status, Transfer,
};

const START: u16 = 0xff00;
const STOP: u16 = 0xff01;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup() -> (Registry<SimDriver>, SimPort) {
    init();
    let mut driver = SimDriver::new();
    let port = driver.add_port(2237_000_001);
    (Registry::new(driver), port)
}

#[test]
fn monitor_decodes_a_simple_write() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.i2c_monitor_enable().unwrap();
    assert!(adapter.config().monitor);

    assert!(port.monitor_capture(&[START, 0x50, 0x11, STOP]));
    let events = adapter.next_monitor_events(100, 64).unwrap();
    assert_eq!(
        events,
        Some(vec![
            MonitorEvent::Start,
            MonitorEvent::Address {
                addr: 0x28,
                read: false,
                nack: false,
                ten_bit: false,
            },
            MonitorEvent::Data {
                value: 0x11,
                nack: false,
            },
            MonitorEvent::Stop,
        ])
    );
    assert_eq!(adapter.next_monitor_events(0, 64), Ok(None));
}

#[test]
fn over_declared_monitor_read_leaves_the_rest_pending() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.i2c_monitor_enable().unwrap();

    port.monitor_capture(&[START, 0x50, 0x11, STOP]);
    let mut raw = [0u16; 2];
    let t = adapter.i2c_monitor_read(100, &mut raw).unwrap();
    assert_eq!(t, Transfer { requested: 2, actual: 2 });
    assert_eq!(raw, [START, 0x50]);

    assert_eq!(adapter.poll(0), Ok(AsyncEvent::I2cMonitor));
    let t = adapter.i2c_monitor_read(100, &mut raw).unwrap();
    assert_eq!(t.actual, 2);
    assert_eq!(raw, [0x11, STOP]);
    assert_eq!(adapter.poll(0), Ok(AsyncEvent::NoData));
}

#[test]
fn monitor_transaction_split_across_reads() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.i2c_monitor_enable().unwrap();

    port.monitor_capture(&[START, 0xf6]);
    assert_eq!(
        adapter.next_monitor_events(0, 64),
        Ok(Some(vec![MonitorEvent::Start]))
    );

    port.monitor_capture(&[0x34, 0x01, STOP]);
    assert_eq!(
        adapter.next_monitor_events(0, 64),
        Ok(Some(vec![
            MonitorEvent::Address {
                addr: 0x334,
                read: false,
                nack: false,
                ten_bit: true,
            },
            MonitorEvent::Data {
                value: 0x01,
                nack: false,
            },
            MonitorEvent::Stop,
        ]))
    );
}

#[test]
fn monitor_excludes_other_functions() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();

    let mut raw = [0u16; 4];
    assert_eq!(
        adapter.i2c_monitor_read(4, &mut raw),
        Err(Error::Status(Status::I2cMonitorNotEnabled))
    );

    adapter.i2c_slave_enable(0x40, 0, 0).unwrap();
    adapter.i2c_monitor_enable().unwrap();
    assert_eq!(adapter.config().i2c_slave, None);
    assert!(!port.master_write(0x40, &[1]));
    assert_eq!(
        adapter.i2c_write(0x50, I2cFlags::empty(), 1, &[0]),
        Err(Error::Status(Status::I2cNotEnabled))
    );

    adapter.i2c_monitor_disable().unwrap();
    assert!(!port.monitor_capture(&[START]));
    assert_eq!(
        adapter.i2c_write(0x50, I2cFlags::empty(), 1, &[0]),
        Err(Error::NoAcknowledge { addr: 0x50 })
    );
}

#[test]
fn gpio_outputs_and_inputs() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.configure(BusMode::GpioOnly).unwrap();

    adapter.gpio_direction(GpioBits::SS | GpioBits::MOSI).unwrap();
    adapter.gpio_set(GpioBits::SS).unwrap();
    assert_eq!(port.gpio_outputs(), GpioBits::SS);
    assert_eq!(adapter.config().gpio_output, GpioBits::SS);

    port.set_gpio_inputs(GpioBits::SCL);
    let level = adapter.gpio_get().unwrap();
    assert!(level.contains(GpioBits::SCL | GpioBits::SS));
    assert!(!level.contains(GpioBits::SDA));

    assert_eq!(
        adapter.gpio_change(Duration::from_secs(100)),
        Err(Error::Request("gpio change timeout too long"))
    );
}

#[test]
fn gpio_change_waits_for_an_input() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.configure(BusMode::GpioOnly).unwrap();
    adapter.gpio_direction(GpioBits::empty()).unwrap();

    // The first call after reconfiguring returns straight away.
    let first = adapter.gpio_change(Duration::from_secs(10)).unwrap();
    assert_eq!(first, GpioBits::all());

    let outside = port.clone();
    let toggler = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        outside.set_gpio_inputs(GpioBits::all() - GpioBits::MISO);
    });
    let changed = adapter.gpio_change(Duration::from_secs(10)).unwrap();
    toggler.join().unwrap();
    assert!(!changed.contains(GpioBits::MISO));
}
