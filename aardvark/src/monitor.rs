//! Module `monitor` decodes the symbol stream captured by the I2C bus
//! monitor.
//!
//! The monitor delivers one 16-bit symbol per bus event: a start condition,
//! a stop condition, or a byte together with the acknowledge bit that
//! followed it. Whether a byte is an address or data depends on the
//! symbols before it, so `MonitorDecoder` carries that context across
//! successive `i2c_monitor_read` batches.

const MONITOR_DATA: u16 = 0x00ff;
const MONITOR_NACK: u16 = 0x0100;
const MONITOR_CMD_START: u16 = 0xff00;
const MONITOR_CMD_STOP: u16 = 0xff01;

/// `MonitorSymbol` is one raw bus event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorSymbol {
    Start,
    Stop,
    Byte { value: u8, nack: bool },
}

impl MonitorSymbol {
    pub fn from_raw(raw: u16) -> MonitorSymbol {
        match raw {
            MONITOR_CMD_START => MonitorSymbol::Start,
            MONITOR_CMD_STOP => MonitorSymbol::Stop,
            _ => MonitorSymbol::Byte {
                value: (raw & MONITOR_DATA) as u8,
                nack: raw & MONITOR_NACK != 0,
            },
        }
    }

    pub fn raw(self) -> u16 {
        match self {
            MonitorSymbol::Start => MONITOR_CMD_START,
            MonitorSymbol::Stop => MONITOR_CMD_STOP,
            MonitorSymbol::Byte { value, nack } => {
                (value as u16) | (if nack { MONITOR_NACK } else { 0 })
            }
        }
    }
}

/// `MonitorEvent` is a decoded bus event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    Start,
    Stop,
    /// A slave address. `nack` is set when no slave acknowledged it.
    Address {
        addr: u16,
        read: bool,
        nack: bool,
        ten_bit: bool,
    },
    Data { value: u8, nack: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    /// A start condition was seen; the next byte is an address.
    AfterStart,
    /// The first byte of a 10-bit address was seen; the next byte
    /// completes it.
    TenBitHigh(u8),
    /// An address was decoded; bytes are data until the next start.
    Data,
}

/// `MonitorDecoder` turns monitor symbols into `MonitorEvent`s.
#[derive(Debug, Clone)]
pub struct MonitorDecoder {
    state: State,
    /// The most recent 10-bit write address since the last stop, which a
    /// repeated-start read may refer back to with only its first byte.
    ten_bit_write: Option<u16>,
}

impl Default for MonitorDecoder {
    fn default() -> Self {
        MonitorDecoder::new()
    }
}

impl MonitorDecoder {
    pub fn new() -> Self {
        MonitorDecoder {
            state: State::Idle,
            ten_bit_write: None,
        }
    }

    /// `reset` forgets any partial transaction.
    pub fn reset(&mut self) {
        *self = MonitorDecoder::new();
    }

    /// `feed` consumes one raw symbol. Returns `None` while a 10-bit address
    /// is only half received.
    pub fn feed(&mut self, raw: u16) -> Option<MonitorEvent> {
        match MonitorSymbol::from_raw(raw) {
            MonitorSymbol::Start => {
                self.state = State::AfterStart;
                Some(MonitorEvent::Start)
            }
            MonitorSymbol::Stop => {
                self.state = State::Idle;
                self.ten_bit_write = None;
                Some(MonitorEvent::Stop)
            }
            MonitorSymbol::Byte { value, nack } => self.byte(value, nack),
        }
    }

    fn byte(&mut self, value: u8, nack: bool) -> Option<MonitorEvent> {
        match self.state {
            State::AfterStart => {
                let read = value & 0x01 != 0;
                if value & 0xf8 != 0xf0 || nack {
                    self.state = State::Data;
                    return Some(MonitorEvent::Address {
                        addr: (value >> 1) as u16,
                        read,
                        nack,
                        ten_bit: false,
                    });
                }
                if read {
                    if let Some(addr) = self.ten_bit_write {
                        if (addr >> 8) as u8 == (value >> 1) & 0x03 {
                            self.state = State::Data;
                            return Some(MonitorEvent::Address {
                                addr,
                                read: true,
                                nack,
                                ten_bit: true,
                            });
                        }
                    }
                }
                self.state = State::TenBitHigh(value);
                None
            }
            State::TenBitHigh(high) => {
                let addr = (((high as u16) << 7) & 0x300) | value as u16;
                let read = high & 0x01 != 0;
                if !read {
                    self.ten_bit_write = Some(addr);
                }
                self.state = State::Data;
                Some(MonitorEvent::Address {
                    addr,
                    read,
                    nack,
                    ten_bit: true,
                })
            }
            State::Idle | State::Data => Some(MonitorEvent::Data { value, nack }),
        }
    }

    /// `decode` feeds a batch of symbols and collects the resulting events.
    pub fn decode(&mut self, raw: &[u16]) -> Vec<MonitorEvent> {
        raw.iter().filter_map(|&r| self.feed(r)).collect()
    }
}
