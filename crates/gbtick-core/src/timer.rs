use log::trace;

use crate::interrupts::{Interrupt, InterruptController};

/// Length of both reload windows, in T-cycles.
const RELOAD_WINDOW: u8 = 4;

/// Phase of the TIMA overflow/reload sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Normal,
    /// TIMA overflowed and reads 0x00; the reload from TMA is still pending
    /// and can be cancelled by a TIMA write.
    OverflowDelay,
    /// TIMA was just reloaded and the interrupt requested. TIMA writes are
    /// ignored and TMA writes go straight through to TIMA.
    ReloadActive,
}

pub struct Timer {
    /// 16-bit internal divider counter. DIV register is the upper 8 bits.
    pub div: u16,
    /// Timer counter
    pub tima: u8,
    /// Timer modulo
    pub tma: u8,
    /// Timer control
    pub tac: u8,
    state: TimerState,
    /// T-cycles left in the current reload window.
    countdown: u8,
    trace: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            div: 0,
            tima: 0,
            tma: 0,
            tac: 0,
            state: TimerState::Normal,
            countdown: 0,
            trace: false,
        }
    }

    pub fn with_trace(trace: bool) -> Self {
        Self {
            trace,
            ..Self::new()
        }
    }

    #[inline]
    pub fn state(&self) -> TimerState {
        self.state
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.tac & 0x04 != 0
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF04 => (self.div >> 8) as u8,
            0xFF05 => self.tima,
            0xFF06 => self.tma,
            0xFF07 => self.tac | 0xF8,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF04 => self.reset_div(),
            0xFF05 => match self.state {
                TimerState::Normal => self.tima = val,
                TimerState::OverflowDelay => {
                    // Writing during the delay cancels the pending reload
                    // together with its interrupt.
                    if self.trace {
                        trace!("TIMA write {val:02X} cancels pending reload");
                    }
                    self.tima = val;
                    self.state = TimerState::Normal;
                    self.countdown = 0;
                }
                TimerState::ReloadActive => {
                    if self.trace {
                        trace!("TIMA write {val:02X} ignored during reload");
                    }
                }
            },
            0xFF06 => {
                self.tma = val;
                if self.state == TimerState::ReloadActive {
                    self.tima = val;
                }
            }
            0xFF07 => {
                let prev = Self::signal_with(self.div, self.tac);
                self.tac = val & 0x07;
                let new = Self::signal_with(self.div, self.tac);
                if prev && !new {
                    self.increment();
                }
            }
            _ => {}
        }
    }

    /// Reset the internal divider counter, applying TIMA edge logic.
    pub fn reset_div(&mut self) {
        let prev = Self::signal_with(self.div, self.tac);
        self.div = 0;
        if prev && !Self::signal_with(self.div, self.tac) {
            self.increment();
        }
    }

    /// Advance the timer by a single T-cycle.
    pub fn tick(&mut self, ints: &mut InterruptController) {
        self.advance_reload(ints);
        let prev = Self::signal_with(self.div, self.tac);
        self.div = self.div.wrapping_add(1);
        if prev && !Self::signal_with(self.div, self.tac) {
            self.increment();
        }
    }

    /// Advance the timer by `cycles` T-cycles and request the timer
    /// interrupt when a reload happens.
    ///
    /// Equivalent to calling [`Timer::tick`] `cycles` times. While the reload
    /// machine is idle the divider jumps straight to the cycle before the next
    /// falling edge of the selected bit.
    pub fn step(&mut self, cycles: u32, ints: &mut InterruptController) {
        let mut remaining = cycles;
        while remaining > 0 {
            if self.state != TimerState::Normal {
                self.tick(ints);
                remaining -= 1;
                continue;
            }
            if !self.enabled() {
                self.div = (self.div as u32).wrapping_add(remaining) as u16;
                return;
            }
            let period = 1u32 << (Self::selected_bit(self.tac) + 1);
            let to_edge = period - (self.div as u32 % period);
            if remaining < to_edge {
                self.div = (self.div as u32 + remaining) as u16;
                return;
            }
            self.div = (self.div as u32 + to_edge - 1) as u16;
            remaining -= to_edge - 1;
            self.tick(ints);
            remaining -= 1;
        }
    }

    fn advance_reload(&mut self, ints: &mut InterruptController) {
        match self.state {
            TimerState::Normal => {}
            TimerState::OverflowDelay => {
                self.countdown -= 1;
                if self.countdown == 0 {
                    self.tima = self.tma;
                    ints.request(Interrupt::Timer);
                    self.state = TimerState::ReloadActive;
                    self.countdown = RELOAD_WINDOW;
                    if self.trace {
                        trace!("TIMA reloaded with {:02X}, timer interrupt requested", self.tma);
                    }
                }
            }
            TimerState::ReloadActive => {
                self.countdown -= 1;
                if self.countdown == 0 {
                    self.state = TimerState::Normal;
                }
            }
        }
    }

    fn increment(&mut self) {
        if self.tima == 0xFF {
            self.tima = 0;
            self.state = TimerState::OverflowDelay;
            self.countdown = RELOAD_WINDOW;
            if self.trace {
                trace!("TIMA overflow at DIV={:04X}", self.div);
            }
        } else {
            // An edge forced by a DIV/TAC write inside the delay window bumps
            // the visible zero; the pending reload still wins.
            self.tima = self.tima.wrapping_add(1);
        }
    }

    /// Divider bit watched for falling edges: TAC select 0-3 map to bits
    /// 9, 3, 5 and 7.
    #[inline]
    fn selected_bit(tac: u8) -> u32 {
        match tac & 0x03 {
            0x00 => 9,
            0x01 => 3,
            0x02 => 5,
            _ => 7,
        }
    }

    #[inline]
    fn signal_with(div: u16, tac: u8) -> bool {
        tac & 0x04 != 0 && (div >> Self::selected_bit(tac)) & 1 != 0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
