use std::thread;
use std::time::{Duration, Instant};

use aardvark::sim::{SimDriver, SimPort};
use aardvark::{AsyncEvent, Error, I2cStatus, Registry, SlaveEvent, Status, Timeout, Transfer};

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
fn undrained_event_is_not_replaced() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.i2c_slave_enable(0x40, 0, 0).unwrap();
    adapter.i2c_slave_set_response(2, &[0xaa, 0xbb]).unwrap();

    assert_eq!(port.master_read(3), Some(vec![0xaa, 0xbb, 0xaa]));
    assert_eq!(adapter.poll(Timeout::NonBlocking), Ok(AsyncEvent::I2cWrite));

    // A lower-numbered kind arriving now must wait its turn.
    assert!(port.master_write(0x40, &[1, 2, 3]));
    assert_eq!(adapter.poll(Timeout::NonBlocking), Ok(AsyncEvent::I2cWrite));
    assert_eq!(adapter.poll(100), Ok(AsyncEvent::I2cWrite));

    // Draining a different kind does not count.
    let mut buf = [0u8; 8];
    assert!(adapter.spi_slave_read(8, &mut buf).is_err());
    assert_eq!(adapter.poll(Timeout::NonBlocking), Ok(AsyncEvent::I2cWrite));

    assert_eq!(adapter.i2c_slave_write_stats(), Ok(3));
    assert_eq!(adapter.poll(Timeout::NonBlocking), Ok(AsyncEvent::I2cRead));
    let (addr, t) = adapter.i2c_slave_read(8, &mut buf).unwrap();
    assert_eq!(addr, 0x40);
    assert_eq!(&buf[..t.actual], &[1, 2, 3]);
    assert_eq!(adapter.poll(Timeout::NonBlocking), Ok(AsyncEvent::NoData));
}

#[test]
fn lowest_kind_is_reported_first() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.i2c_slave_enable(0x40, 0, 0).unwrap();
    adapter.spi_slave_enable().unwrap();

    port.spi_master_transfer(&[9]).unwrap();
    port.master_write(0x40, &[1]);
    assert_eq!(adapter.poll(0), Ok(AsyncEvent::I2cRead));
    adapter.i2c_slave_read(1, &mut [0u8; 1]).unwrap();
    assert_eq!(adapter.poll(0), Ok(AsyncEvent::Spi));
}

#[test]
fn poll_times_out_without_data() {
    let (mut registry, _port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.spi_slave_enable().unwrap();

    let started = Instant::now();
    assert_eq!(
        adapter.poll(Duration::from_millis(30)),
        Ok(AsyncEvent::NoData)
    );
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(adapter.next_slave_event(0, &mut [0u8; 4]), Ok(None));
}

#[test]
fn poll_wakes_when_data_arrives() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.spi_slave_enable().unwrap();
    adapter.spi_slave_set_response(1, &[0x5a]).unwrap();

    let master = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        port.spi_master_transfer(&[1, 2, 3, 4])
    });
    assert_eq!(adapter.poll(Timeout::Forever), Ok(AsyncEvent::Spi));
    assert_eq!(master.join().unwrap(), Some(vec![0x5a; 4]));

    let mut buf = [0u8; 16];
    let t = adapter.spi_slave_read(16, &mut buf).unwrap();
    assert_eq!(&buf[..t.actual], &[1, 2, 3, 4]);
}

#[test]
fn try_event_would_block() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.spi_slave_enable().unwrap();

    assert!(matches!(adapter.try_event(), Err(nb::Error::WouldBlock)));
    port.spi_master_transfer(&[7]);
    assert_eq!(nb::block!(adapter.try_event()), Ok(AsyncEvent::Spi));
    // Still pending until drained.
    assert_eq!(nb::block!(adapter.try_event()), Ok(AsyncEvent::Spi));
}

#[test]
fn slave_events_are_drained_in_one_step() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.i2c_slave_enable(0x33, 0, 2).unwrap();
    adapter.spi_slave_enable().unwrap();

    let mut buf = [0u8; 8];
    assert!(port.master_write(0x33, &[4, 5, 6]));
    assert_eq!(
        adapter.next_slave_event(0, &mut buf),
        Ok(Some(SlaveEvent::MasterWrite { addr: 0x33, len: 2 }))
    );
    assert_eq!(&buf[..2], &[4, 5]);

    port.master_read(5);
    assert_eq!(
        adapter.next_slave_event(0, &mut buf),
        Ok(Some(SlaveEvent::MasterRead { len: 5 }))
    );

    port.spi_master_transfer(&[0xde, 0xad]);
    assert_eq!(
        adapter.next_slave_event(0, &mut buf),
        Ok(Some(SlaveEvent::Spi { len: 2 }))
    );
    assert_eq!(&buf[..2], &[0xde, 0xad]);
    assert_eq!(adapter.next_slave_event(0, &mut buf), Ok(None));
}

#[test]
fn disabling_a_slave_forgets_its_pending_event() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.i2c_slave_enable(0x40, 0, 0).unwrap();

    port.master_write(0x40, &[1]);
    assert_eq!(adapter.poll(0), Ok(AsyncEvent::I2cRead));
    adapter.i2c_slave_disable().unwrap();
    assert_eq!(adapter.poll(0), Ok(AsyncEvent::NoData));
    assert_eq!(adapter.config().i2c_slave, None);
}

#[test]
fn monitor_data_is_not_a_slave_event() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.i2c_monitor_enable().unwrap();

    port.monitor_capture(&[0xff00, 0x50, 0xff01]);
    assert_eq!(
        adapter.next_slave_event(0, &mut [0u8; 4]),
        Err(Error::Request("monitor data pending"))
    );
    assert_eq!(adapter.poll(0), Ok(AsyncEvent::I2cMonitor));

    let mut raw = [0u16; 8];
    let t = adapter.i2c_monitor_read(8, &mut raw).unwrap();
    assert_eq!(&raw[..t.actual], &[0xff00, 0x50, 0xff01]);
    assert_eq!(adapter.poll(0), Ok(AsyncEvent::NoData));
}

#[test]
fn over_declared_slave_reads_stop_at_the_buffer() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.i2c_slave_enable(0x40, 0, 0).unwrap();
    adapter.spi_slave_enable().unwrap();

    assert!(port.master_write(0x40, &[1, 2, 3, 4]));
    let mut buf = [0u8; 2];
    let (addr, t) = adapter.i2c_slave_read(100, &mut buf).unwrap();
    assert_eq!(addr, 0x40);
    assert_eq!(t, Transfer { requested: 2, actual: 2 });
    assert_eq!(buf, [1, 2]);

    port.spi_master_transfer(&[9, 8, 7, 6, 5, 4]).unwrap();
    let mut buf = [0u8; 4];
    let t = adapter.spi_slave_read(100, &mut buf).unwrap();
    assert_eq!(t, Transfer { requested: 4, actual: 4 });
    assert_eq!(buf, [9, 8, 7, 6]);
    assert_eq!(adapter.poll(0), Ok(AsyncEvent::NoData));
}

#[test]
fn extended_slave_calls_report_status() {
    let (mut registry, port) = setup();
    let handle = registry.open(0).unwrap();
    let mut adapter = registry.adapter(handle).unwrap();
    adapter.i2c_slave_enable(0x40, 2, 0).unwrap();
    adapter.i2c_slave_set_response(3, &[0xaa, 0xbb, 0xcc]).unwrap();

    assert_eq!(port.master_read(5), Some(vec![0xaa, 0xbb]));
    assert_eq!(adapter.poll(0), Ok(AsyncEvent::I2cWrite));
    assert_eq!(adapter.i2c_slave_write_stats_ext(), Ok((2, I2cStatus::LastDataAck)));
    assert_eq!(adapter.poll(0), Ok(AsyncEvent::NoData));

    assert!(port.master_write(0x40, &[1, 2, 3]));
    assert_eq!(adapter.poll(0), Ok(AsyncEvent::I2cRead));
    let mut buf = [0u8; 8];
    assert_eq!(
        adapter.i2c_slave_read_ext(100, &mut buf),
        Ok((0x40, Transfer { requested: 8, actual: 3 }, I2cStatus::Ok))
    );
    assert_eq!(adapter.poll(0), Ok(AsyncEvent::NoData));

    assert_eq!(
        adapter.i2c_slave_read_ext(8, &mut buf),
        Err(Error::Status(Status::I2cSlaveTimeout))
    );
}
