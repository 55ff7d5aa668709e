use log::debug;

use crate::interrupts::{Interrupt, InterruptController};

/// DIV bit whose falling edge clocks one bit in normal internal-clock mode.
const NORMAL_CLOCK_BIT: u32 = 8;
/// CGB fast clock (SC bit 1).
const FAST_CLOCK_BIT: u32 = 3;

pub trait LinkPort: Send {
    /// Exchange a byte with the link partner and return the byte received.
    fn transfer(&mut self, byte: u8) -> u8;
}

/// Link port with no cable attached. The line floats high so every transfer
/// receives 0xFF, unless `loopback` echoes the outgoing byte back.
#[derive(Default)]
pub struct NullLinkPort {
    loopback: bool,
}

impl NullLinkPort {
    pub fn new(loopback: bool) -> Self {
        Self { loopback }
    }
}

impl LinkPort for NullLinkPort {
    fn transfer(&mut self, byte: u8) -> u8 {
        if self.loopback { byte } else { 0xFF }
    }
}

struct Transfer {
    outgoing: u8,
    incoming: u8,
    bits_left: u8,
    fast_clock: bool,
}

/// SB/SC serial port.
///
/// Every byte shifted out is also appended to a capture buffer, which test
/// programs use as their console.
pub struct Serial {
    sb: u8,
    sc: u8,
    out_buf: Vec<u8>,
    port: Box<dyn LinkPort>,
    transfer: Option<Transfer>,
    cgb_mode: bool,
    trace: bool,
}

impl Serial {
    pub fn new(cgb_mode: bool) -> Self {
        Self::with_trace(cgb_mode, false)
    }

    pub fn with_trace(cgb_mode: bool, trace: bool) -> Self {
        Self {
            sb: 0,
            sc: 0,
            out_buf: Vec::new(),
            port: Box::new(NullLinkPort::default()),
            transfer: None,
            cgb_mode,
            trace,
        }
    }

    pub fn connect(&mut self, port: Box<dyn LinkPort>) {
        self.port = port;
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF01 => self.sb,
            0xFF02 => self.sc | 0x7E,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF01 => self.sb = val,
            0xFF02 => {
                self.sc = val & if self.cgb_mode { 0x83 } else { 0x81 };
                // Clearing bit 7 cancels a transfer in flight; setting it
                // again restarts from the current SB.
                self.transfer = None;
                if val & 0x81 == 0x81 {
                    let fast_clock = self.cgb_mode && val & 0x02 != 0;
                    let incoming = self.port.transfer(self.sb);
                    self.transfer = Some(Transfer {
                        outgoing: self.sb,
                        incoming,
                        bits_left: 8,
                        fast_clock,
                    });
                }
                // External clock transfers wait for a partner that never
                // clocks, so SC bit 7 simply stays set.
            }
            _ => {}
        }
    }

    /// Shift bits on falling edges of the clocking DIV bit between
    /// `prev_div` and `curr_div`.
    pub fn step(&mut self, prev_div: u16, curr_div: u16, ints: &mut InterruptController) {
        let Some(transfer) = self.transfer.as_mut() else {
            return;
        };
        let bit = if transfer.fast_clock {
            FAST_CLOCK_BIT
        } else {
            NORMAL_CLOCK_BIT
        };

        let mut div = prev_div;
        for _ in 0..curr_div.wrapping_sub(prev_div) {
            let next = div.wrapping_add(1);
            if (div >> bit) & 1 != 0 && (next >> bit) & 1 == 0 {
                self.sb = (self.sb << 1) | (transfer.incoming >> 7);
                transfer.incoming <<= 1;
                transfer.bits_left -= 1;
                if transfer.bits_left == 0 {
                    break;
                }
            }
            div = next;
        }

        if transfer.bits_left == 0 {
            let outgoing = transfer.outgoing;
            self.transfer = None;
            self.out_buf.push(outgoing);
            self.sc &= 0x7F;
            ints.request(Interrupt::Serial);
            if self.trace {
                debug!("serial byte {outgoing:02X} sent");
            }
        }
    }

    pub fn transfer_active(&self) -> bool {
        self.transfer.is_some()
    }

    /// Drain the captured outgoing bytes.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out_buf)
    }

    pub fn peek_output(&self) -> &[u8] {
        &self.out_buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedInLinkPort(u8);

    impl LinkPort for FixedInLinkPort {
        fn transfer(&mut self, _byte: u8) -> u8 {
            self.0
        }
    }

    fn started(cgb: bool, sc: u8) -> Serial {
        let mut serial = Serial::new(cgb);
        serial.connect(Box::new(FixedInLinkPort(0x34)));
        serial.write(0xFF01, 0x12);
        serial.write(0xFF02, sc);
        serial
    }

    #[test]
    fn internal_clock_irq_only_on_final_bit() {
        let mut serial = started(false, 0x81);
        let mut ints = InterruptController::new();

        // 7 falling edges of DIV bit 8.
        serial.step(0, 3584, &mut ints);
        assert_ne!(serial.read(0xFF02) & 0x80, 0);
        assert!(!ints.is_requested(Interrupt::Serial));

        serial.step(3584, 4096, &mut ints);
        assert_eq!(serial.read(0xFF02) & 0x80, 0);
        assert!(ints.is_requested(Interrupt::Serial));
        assert_eq!(serial.read(0xFF01), 0x34);
        assert_eq!(serial.take_output(), vec![0x12]);
        assert!(serial.peek_output().is_empty());
    }

    #[test]
    fn clearing_start_bit_cancels() {
        let mut serial = started(false, 0x81);
        serial.write(0xFF02, 0x01);
        let mut ints = InterruptController::new();
        serial.step(0, 8192, &mut ints);
        assert!(!ints.is_requested(Interrupt::Serial));
        assert!(serial.peek_output().is_empty());
    }

    #[test]
    fn external_clock_stalls() {
        let mut serial = started(false, 0x80);
        let mut ints = InterruptController::new();
        serial.step(0, 60000, &mut ints);
        assert_ne!(serial.read(0xFF02) & 0x80, 0);
        assert!(!serial.transfer_active());
        assert!(!ints.is_requested(Interrupt::Serial));
    }

    #[test]
    fn cgb_fast_clock() {
        let mut serial = started(true, 0x83);
        let mut ints = InterruptController::new();
        serial.step(0, 127, &mut ints);
        assert!(!ints.is_requested(Interrupt::Serial));
        serial.step(127, 128, &mut ints);
        assert!(ints.is_requested(Interrupt::Serial));
    }

    #[test]
    fn trace_flag_only_affects_logging() {
        let mut quiet = Serial::new(false);
        let mut traced = Serial::with_trace(false, true);
        let mut ints = InterruptController::new();
        for serial in [&mut quiet, &mut traced] {
            serial.write(0xFF01, 0x5A);
            serial.write(0xFF02, 0x81);
            serial.step(0, 4096, &mut ints);
        }
        assert_eq!(quiet.take_output(), traced.take_output());
        assert_eq!(quiet.read(0xFF02), traced.read(0xFF02));
    }

    #[test]
    fn no_partner_receives_ff() {
        let mut serial = Serial::new(false);
        serial.write(0xFF01, b'A');
        serial.write(0xFF02, 0x81);
        let mut ints = InterruptController::new();
        serial.step(0, 4096, &mut ints);
        assert_eq!(serial.read(0xFF01), 0xFF);
        assert_eq!(serial.peek_output(), b"A");
    }
}
