use crate::hardware::{DmgRevision, Model, boot_registers};

// CPU flag bits as documented in gbdev.io/pandocs/The_CPU_Flags.html
pub const FLAG_Z: u8 = 0x80; // Zero
pub const FLAG_N: u8 = 0x40; // Subtract
pub const FLAG_H: u8 = 0x20; // Half Carry
pub const FLAG_C: u8 = 0x10; // Carry

// Post-boot CPU state from gbdev.io/pandocs/Power_Up_State.html
const BOOT_PC: u16 = 0x0100;
const BOOT_SP: u16 = 0xFFFE;

/// 8-bit register operand as encoded in the low/middle three opcode bits.
///
/// Index 6 selects `(HL)` in the instruction encoding and is handled by the
/// CPU, so it has no variant here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg8 {
    B,
    C,
    D,
    E,
    H,
    L,
    A,
}

impl Reg8 {
    /// Decode a register index (0..=7, excluding 6).
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => Reg8::B,
            1 => Reg8::C,
            2 => Reg8::D,
            3 => Reg8::E,
            4 => Reg8::H,
            5 => Reg8::L,
            7 => Reg8::A,
            _ => unreachable!("register index {index} has no 8-bit register"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg16 {
    AF,
    BC,
    DE,
    HL,
    SP,
}

impl Reg16 {
    /// Decode the two-bit pair field used by LD rr,d16 / INC rr / ADD HL,rr.
    pub fn from_index_sp(index: u8) -> Self {
        match index {
            0 => Reg16::BC,
            1 => Reg16::DE,
            2 => Reg16::HL,
            3 => Reg16::SP,
            _ => unreachable!("register pair index {index} out of range"),
        }
    }

    /// Decode the two-bit pair field used by PUSH/POP.
    pub fn from_index_af(index: u8) -> Self {
        match index {
            0 => Reg16::BC,
            1 => Reg16::DE,
            2 => Reg16::HL,
            3 => Reg16::AF,
            _ => unreachable!("register pair index {index} out of range"),
        }
    }
}

/// SM83 register file.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Registers {
    pub a: u8,
    f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
}

impl Registers {
    /// Register file loaded with the post-boot values of the given hardware.
    pub fn post_boot(model: Model, revision: DmgRevision) -> Self {
        let [a, f, b, c, d, e, h, l] = boot_registers(model, revision);
        Self {
            a,
            f: f & 0xF0,
            b,
            c,
            d,
            e,
            h,
            l,
            sp: BOOT_SP,
            pc: BOOT_PC,
        }
    }

    #[inline]
    pub fn f(&self) -> u8 {
        self.f
    }

    /// The low nibble of F is hard-wired to zero.
    #[inline]
    pub fn set_f(&mut self, val: u8) {
        self.f = val & 0xF0;
    }

    #[inline]
    pub fn flag(&self, mask: u8) -> bool {
        self.f & mask != 0
    }

    #[inline]
    pub fn set_flag(&mut self, mask: u8, on: bool) {
        if on {
            self.f |= mask;
        } else {
            self.f &= !mask;
        }
        self.f &= 0xF0;
    }

    pub fn get8(&self, reg: Reg8) -> u8 {
        match reg {
            Reg8::B => self.b,
            Reg8::C => self.c,
            Reg8::D => self.d,
            Reg8::E => self.e,
            Reg8::H => self.h,
            Reg8::L => self.l,
            Reg8::A => self.a,
        }
    }

    pub fn set8(&mut self, reg: Reg8, val: u8) {
        match reg {
            Reg8::B => self.b = val,
            Reg8::C => self.c = val,
            Reg8::D => self.d = val,
            Reg8::E => self.e = val,
            Reg8::H => self.h = val,
            Reg8::L => self.l = val,
            Reg8::A => self.a = val,
        }
    }

    pub fn get16(&self, reg: Reg16) -> u16 {
        match reg {
            Reg16::AF => self.af(),
            Reg16::BC => self.bc(),
            Reg16::DE => self.de(),
            Reg16::HL => self.hl(),
            Reg16::SP => self.sp,
        }
    }

    pub fn set16(&mut self, reg: Reg16, val: u16) {
        match reg {
            Reg16::AF => self.set_af(val),
            Reg16::BC => self.set_bc(val),
            Reg16::DE => self.set_de(val),
            Reg16::HL => self.set_hl(val),
            Reg16::SP => self.sp = val,
        }
    }

    #[inline]
    pub fn af(&self) -> u16 {
        ((self.a as u16) << 8) | self.f as u16
    }

    #[inline]
    pub fn set_af(&mut self, val: u16) {
        self.a = (val >> 8) as u8;
        self.f = (val as u8) & 0xF0;
    }

    #[inline]
    pub fn bc(&self) -> u16 {
        ((self.b as u16) << 8) | self.c as u16
    }

    #[inline]
    pub fn set_bc(&mut self, val: u16) {
        self.b = (val >> 8) as u8;
        self.c = val as u8;
    }

    #[inline]
    pub fn de(&self) -> u16 {
        ((self.d as u16) << 8) | self.e as u16
    }

    #[inline]
    pub fn set_de(&mut self, val: u16) {
        self.d = (val >> 8) as u8;
        self.e = val as u8;
    }

    #[inline]
    pub fn hl(&self) -> u16 {
        ((self.h as u16) << 8) | self.l as u16
    }

    #[inline]
    pub fn set_hl(&mut self, val: u16) {
        self.h = (val >> 8) as u8;
        self.l = val as u8;
    }
}
