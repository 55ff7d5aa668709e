//! IE/IF register pair.
//!
//! The controller only stores request and enable bits. Arbitration and the
//! dispatch sequence live in the CPU, which is the only unit that knows when
//! fetch can be suspended.

// Interrupt vectors (gbdev.io/pandocs/Interrupts.html)
const INTERRUPT_VBLANK: u16 = 0x40;
const INTERRUPT_STAT: u16 = 0x48;
const INTERRUPT_TIMER: u16 = 0x50;
const INTERRUPT_SERIAL: u16 = 0x58;
const INTERRUPT_JOYPAD: u16 = 0x60;

/// Bits 0-4 of IE/IF.
pub const INTERRUPT_MASK: u8 = 0x1F;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    VBlank,
    LcdStat,
    Timer,
    Serial,
    Joypad,
}

impl Interrupt {
    pub const ALL: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::LcdStat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    #[inline]
    pub const fn bit(self) -> u8 {
        match self {
            Interrupt::VBlank => 0,
            Interrupt::LcdStat => 1,
            Interrupt::Timer => 2,
            Interrupt::Serial => 3,
            Interrupt::Joypad => 4,
        }
    }

    #[inline]
    pub const fn mask(self) -> u8 {
        1 << self.bit()
    }

    pub const fn vector(self) -> u16 {
        match self {
            Interrupt::VBlank => INTERRUPT_VBLANK,
            Interrupt::LcdStat => INTERRUPT_STAT,
            Interrupt::Timer => INTERRUPT_TIMER,
            Interrupt::Serial => INTERRUPT_SERIAL,
            Interrupt::Joypad => INTERRUPT_JOYPAD,
        }
    }

    pub fn from_bit(bit: u8) -> Self {
        match bit {
            0 => Interrupt::VBlank,
            1 => Interrupt::LcdStat,
            2 => Interrupt::Timer,
            3 => Interrupt::Serial,
            4 => Interrupt::Joypad,
            _ => unreachable!("interrupt bit {bit} out of range"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterruptController {
    ie: u8,
    if_reg: u8,
}

impl InterruptController {
    pub fn new() -> Self {
        Self { ie: 0, if_reg: 0 }
    }

    /// Controller as left by the boot ROM: a VBlank request is already
    /// latched in IF (FF0F reads 0xE1).
    pub fn post_boot() -> Self {
        Self {
            ie: 0,
            if_reg: Interrupt::VBlank.mask(),
        }
    }

    #[inline]
    pub fn read_ie(&self) -> u8 {
        self.ie
    }

    #[inline]
    pub fn write_ie(&mut self, val: u8) {
        self.ie = val;
    }

    /// Unused IF bits always read back as 1.
    #[inline]
    pub fn read_if(&self) -> u8 {
        self.if_reg | !INTERRUPT_MASK
    }

    #[inline]
    pub fn write_if(&mut self, val: u8) {
        self.if_reg = val & INTERRUPT_MASK;
    }

    /// Latch a request. Independent of IME and IE.
    #[inline]
    pub fn request(&mut self, interrupt: Interrupt) {
        self.if_reg |= interrupt.mask();
    }

    #[inline]
    pub fn acknowledge(&mut self, interrupt: Interrupt) {
        self.if_reg &= !interrupt.mask();
    }

    #[inline]
    pub fn is_requested(&self, interrupt: Interrupt) -> bool {
        self.if_reg & interrupt.mask() != 0
    }

    /// Requested and enabled sources, ignoring IME.
    #[inline]
    pub fn pending(&self) -> u8 {
        self.ie & self.if_reg & INTERRUPT_MASK
    }
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new()
    }
}
