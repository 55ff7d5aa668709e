use log::{debug, trace};

use crate::bus::MemoryBus;
use crate::config::CoreConfig;
use crate::interrupts::Interrupt;
use crate::registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z, Reg8, Reg16, Registers};

/// T-cycles per machine cycle at normal speed.
pub const CYCLES_PER_M_CYCLE: u32 = 4;

/// Base cost of every opcode in T-cycles. Conditional branches list the
/// not-taken cost. 0xCB is costed by [`cb_cycles`]; undefined opcodes are 0.
#[rustfmt::skip]
const OPCODE_CYCLES: [u8; 256] = [
//  x0  x1  x2  x3  x4  x5  x6  x7  x8  x9  xA  xB  xC  xD  xE  xF
     4, 12,  8,  8,  4,  4,  8,  4, 20,  8,  8,  8,  4,  4,  8,  4, // 0x
     4, 12,  8,  8,  4,  4,  8,  4, 12,  8,  8,  8,  4,  4,  8,  4, // 1x
     8, 12,  8,  8,  4,  4,  8,  4,  8,  8,  8,  8,  4,  4,  8,  4, // 2x
     8, 12,  8,  8, 12, 12, 12,  4,  8,  8,  8,  8,  4,  4,  8,  4, // 3x
     4,  4,  4,  4,  4,  4,  8,  4,  4,  4,  4,  4,  4,  4,  8,  4, // 4x
     4,  4,  4,  4,  4,  4,  8,  4,  4,  4,  4,  4,  4,  4,  8,  4, // 5x
     4,  4,  4,  4,  4,  4,  8,  4,  4,  4,  4,  4,  4,  4,  8,  4, // 6x
     8,  8,  8,  8,  8,  8,  4,  8,  4,  4,  4,  4,  4,  4,  8,  4, // 7x
     4,  4,  4,  4,  4,  4,  8,  4,  4,  4,  4,  4,  4,  4,  8,  4, // 8x
     4,  4,  4,  4,  4,  4,  8,  4,  4,  4,  4,  4,  4,  4,  8,  4, // 9x
     4,  4,  4,  4,  4,  4,  8,  4,  4,  4,  4,  4,  4,  4,  8,  4, // Ax
     4,  4,  4,  4,  4,  4,  8,  4,  4,  4,  4,  4,  4,  4,  8,  4, // Bx
     8, 12, 12, 16, 12, 16,  8, 16,  8, 16, 12,  0, 12, 24,  8, 16, // Cx
     8, 12, 12,  0, 12, 16,  8, 16,  8, 16, 12,  0, 12,  0,  8, 16, // Dx
    12, 12,  8,  0,  0, 16,  8, 16, 16,  4, 16,  0,  0,  0,  8, 16, // Ex
    12, 12,  8,  4,  0, 16,  8, 16, 12,  8, 16,  4,  0,  0,  8, 16, // Fx
];

// Extra cost when a conditional branch is taken.
const JR_TAKEN_CYCLES: u32 = 4;
const JP_TAKEN_CYCLES: u32 = 4;
const CALL_TAKEN_CYCLES: u32 = 12;
const RET_TAKEN_CYCLES: u32 = 12;

/// Total cost of a 0xCB-prefixed instruction, prefix fetch included.
#[inline]
fn cb_cycles(opcode: u8) -> u32 {
    match (opcode & 0x07, opcode) {
        (6, 0x40..=0x7F) => 12,
        (6, _) => 16,
        _ => 8,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// Waiting in HALT for `IE & IF` to become non-zero.
    Halted,
    /// Waiting in STOP. Any pending interrupt resumes execution.
    Stopped,
}

/// Interrupt dispatch in flight. Each [`Cpu::step`] performs one M-cycle of
/// it so bus writes and the interrupt controller interleave the way they do
/// on hardware.
#[derive(Clone, Copy, Debug)]
struct Dispatch {
    stage: u8,
    return_pc: u16,
    vector: u16,
}

const DISPATCH_STAGES: u8 = 5;

pub struct Cpu {
    pub regs: Registers,
    /// T-cycles consumed since construction.
    pub cycles: u64,
    pub ime: bool,
    pub state: RunState,
    halt_bug: bool,
    ime_enable_delay: u8,
    dispatch: Option<Dispatch>,
    /// T-cycle offset of the next bus access within the current step.
    access_cycle: u32,
    trace: bool,
}

impl Cpu {
    /// CPU holding the post-boot register state of the configured model.
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            regs: Registers::post_boot(config.model, config.dmg_revision),
            cycles: 0,
            ime: false,
            state: RunState::Running,
            halt_bug: false,
            ime_enable_delay: 0,
            dispatch: None,
            access_cycle: 0,
            trace: config.trace.cpu,
        }
    }

    #[inline]
    pub fn halted(&self) -> bool {
        self.state == RunState::Halted
    }

    #[inline]
    pub fn stopped(&self) -> bool {
        self.state == RunState::Stopped
    }

    /// Whether an interrupt dispatch sequence is in progress.
    #[inline]
    pub fn dispatching(&self) -> bool {
        self.dispatch.is_some()
    }

    /// Formatted CPU state string for debugging.
    pub fn debug_state(&self) -> String {
        format!(
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X} CY:{}",
            self.regs.af(),
            self.regs.bc(),
            self.regs.de(),
            self.regs.hl(),
            self.regs.pc,
            self.regs.sp,
            self.cycles
        )
    }

    /// Advance by one instruction, one dispatch M-cycle, or one idle M-cycle
    /// while halted or stopped. Returns the T-cycles consumed; the caller is
    /// responsible for clocking the rest of the system by that amount.
    pub fn step<B: MemoryBus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let cycles = if self.dispatch.is_some() {
            self.dispatch_cycle(bus)
        } else {
            match self.state {
                RunState::Halted | RunState::Stopped => {
                    if bus.interrupts().pending() != 0 {
                        if self.trace {
                            debug!("{:?} -> Running at PC={:04X}", self.state, self.regs.pc);
                        }
                        self.state = RunState::Running;
                    }
                    CYCLES_PER_M_CYCLE
                }
                RunState::Running if self.ime && bus.interrupts().pending() != 0 => {
                    self.begin_dispatch();
                    self.dispatch_cycle(bus)
                }
                RunState::Running => self.execute(bus),
            }
        };
        self.cycles += cycles as u64;
        cycles
    }

    fn begin_dispatch(&mut self) {
        let mut return_pc = self.regs.pc;
        if self.halt_bug {
            // EI; HALT with a request already pending: the dispatch returns
            // to the HALT itself.
            self.halt_bug = false;
            return_pc = return_pc.wrapping_sub(1);
        }
        self.dispatch = Some(Dispatch {
            stage: 0,
            return_pc,
            vector: 0,
        });
    }

    fn dispatch_cycle<B: MemoryBus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let Some(mut dispatch) = self.dispatch.take() else {
            return CYCLES_PER_M_CYCLE;
        };
        self.access_cycle = 0;
        match dispatch.stage {
            0 => {
                self.ime = false;
                self.ime_enable_delay = 0;
            }
            1 => {}
            2 => {
                self.regs.sp = self.regs.sp.wrapping_sub(1);
                self.write8(bus, self.regs.sp, (dispatch.return_pc >> 8) as u8);
            }
            3 => {
                // The high-byte push may have landed on IE, so the source is
                // chosen only now. Nothing left pending cancels the dispatch
                // and execution continues at 0x0000.
                let pending = bus.interrupts().pending();
                dispatch.vector = match Self::next_interrupt(pending) {
                    Some(irq) => {
                        bus.interrupts().acknowledge(irq);
                        if self.trace {
                            debug!(
                                "dispatch {irq:?} from {:04X} to {:04X}",
                                dispatch.return_pc,
                                irq.vector()
                            );
                        }
                        irq.vector()
                    }
                    None => {
                        if self.trace {
                            debug!("dispatch from {:04X} cancelled", dispatch.return_pc);
                        }
                        0x0000
                    }
                };
                self.regs.sp = self.regs.sp.wrapping_sub(1);
                self.write8(bus, self.regs.sp, dispatch.return_pc as u8);
            }
            _ => {
                self.regs.pc = dispatch.vector;
                return CYCLES_PER_M_CYCLE;
            }
        }
        dispatch.stage += 1;
        debug_assert!(dispatch.stage < DISPATCH_STAGES);
        self.dispatch = Some(dispatch);
        CYCLES_PER_M_CYCLE
    }

    /// Highest-priority pending source: lowest bit wins.
    fn next_interrupt(pending: u8) -> Option<Interrupt> {
        if pending == 0 {
            None
        } else {
            Some(Interrupt::from_bit(pending.trailing_zeros() as u8))
        }
    }

    fn execute<B: MemoryBus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let pc = self.regs.pc;
        let enable_after = self.ime_enable_delay == 1;
        self.access_cycle = 0;
        let opcode = if self.halt_bug {
            // The byte after HALT is read without advancing PC.
            self.halt_bug = false;
            self.read8(bus, pc)
        } else {
            self.fetch8(bus)
        };
        if self.trace {
            trace!(
                "{pc:04X}: {opcode:02X}  AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} SP:{:04X}",
                self.regs.af(),
                self.regs.bc(),
                self.regs.de(),
                self.regs.hl(),
                self.regs.sp
            );
        }

        let cycles = self.execute_opcode(opcode, pc, bus);

        if enable_after && self.ime_enable_delay > 0 {
            self.ime = true;
        }
        if self.ime_enable_delay > 0 {
            self.ime_enable_delay -= 1;
        }
        cycles
    }

    /// Bus read in the next M-cycle of the current step.
    #[inline]
    fn read8<B: MemoryBus + ?Sized>(&mut self, bus: &mut B, addr: u16) -> u8 {
        bus.sync(self.access_cycle);
        let val = bus.read(addr);
        self.access_cycle += CYCLES_PER_M_CYCLE;
        val
    }

    #[inline]
    fn write8<B: MemoryBus + ?Sized>(&mut self, bus: &mut B, addr: u16, val: u8) {
        bus.sync(self.access_cycle);
        bus.write(addr, val);
        self.access_cycle += CYCLES_PER_M_CYCLE;
    }

    /// M-cycle with no bus access.
    #[inline]
    fn idle(&mut self) {
        self.access_cycle += CYCLES_PER_M_CYCLE;
    }

    #[inline]
    fn fetch8<B: MemoryBus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let val = self.read8(bus, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        val
    }

    #[inline]
    fn fetch16<B: MemoryBus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch8(bus) as u16;
        let hi = self.fetch8(bus) as u16;
        (hi << 8) | lo
    }

    /// Internal M-cycle, then the high and low byte writes.
    fn push16<B: MemoryBus + ?Sized>(&mut self, bus: &mut B, val: u16) {
        self.idle();
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write8(bus, self.regs.sp, (val >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write8(bus, self.regs.sp, val as u8);
    }

    fn pop16<B: MemoryBus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = self.read8(bus, self.regs.sp) as u16;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.read8(bus, self.regs.sp) as u16;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        (hi << 8) | lo
    }

    /// Operand selected by a three-bit register field; 6 is `(HL)`.
    fn read_operand<B: MemoryBus + ?Sized>(&mut self, bus: &mut B, index: u8) -> u8 {
        match index {
            6 => self.read8(bus, self.regs.hl()),
            _ => self.regs.get8(Reg8::from_index(index)),
        }
    }

    fn write_operand<B: MemoryBus + ?Sized>(&mut self, bus: &mut B, index: u8, val: u8) {
        match index {
            6 => self.write8(bus, self.regs.hl(), val),
            _ => self.regs.set8(Reg8::from_index(index), val),
        }
    }

    #[inline]
    fn set_flags(&mut self, z: bool, n: bool, h: bool, c: bool) {
        self.regs.set_f(
            if z { FLAG_Z } else { 0 }
                | if n { FLAG_N } else { 0 }
                | if h { FLAG_H } else { 0 }
                | if c { FLAG_C } else { 0 },
        );
    }

    /// Branch condition encoded in opcode bits 3-4: NZ, Z, NC, C.
    #[inline]
    fn condition(&self, opcode: u8) -> bool {
        match (opcode >> 3) & 0x03 {
            0 => !self.regs.flag(FLAG_Z),
            1 => self.regs.flag(FLAG_Z),
            2 => !self.regs.flag(FLAG_C),
            _ => self.regs.flag(FLAG_C),
        }
    }

    /// ADD ADC SUB SBC AND XOR OR CP, selected by opcode bits 3-5.
    fn alu(&mut self, op: u8, val: u8) {
        let a = self.regs.a;
        let carry = self.regs.flag(FLAG_C) as u8;
        match op & 0x07 {
            0 | 1 => {
                let c = if op & 0x07 == 1 { carry } else { 0 };
                let res = a as u16 + val as u16 + c as u16;
                let half = (a & 0x0F) + (val & 0x0F) + c > 0x0F;
                self.regs.a = res as u8;
                self.set_flags(res as u8 == 0, false, half, res > 0xFF);
            }
            4 => {
                self.regs.a = a & val;
                self.set_flags(self.regs.a == 0, false, true, false);
            }
            5 => {
                self.regs.a = a ^ val;
                self.set_flags(self.regs.a == 0, false, false, false);
            }
            6 => {
                self.regs.a = a | val;
                self.set_flags(self.regs.a == 0, false, false, false);
            }
            sub => {
                let c = if sub == 3 { carry } else { 0 };
                let res = a as i16 - val as i16 - c as i16;
                let half = (a & 0x0F) < (val & 0x0F) + c;
                // CP (7) only sets flags.
                if sub != 7 {
                    self.regs.a = res as u8;
                }
                self.set_flags(res as u8 == 0, true, half, res < 0);
            }
        }
    }

    fn inc8(&mut self, val: u8) -> u8 {
        let res = val.wrapping_add(1);
        let c = self.regs.flag(FLAG_C);
        self.set_flags(res == 0, false, val & 0x0F == 0x0F, c);
        res
    }

    fn dec8(&mut self, val: u8) -> u8 {
        let res = val.wrapping_sub(1);
        let c = self.regs.flag(FLAG_C);
        self.set_flags(res == 0, true, val & 0x0F == 0, c);
        res
    }

    fn add_hl(&mut self, val: u16) {
        let hl = self.regs.hl();
        let (res, carry) = hl.overflowing_add(val);
        let half = (hl & 0x0FFF) + (val & 0x0FFF) > 0x0FFF;
        let z = self.regs.flag(FLAG_Z);
        self.set_flags(z, false, half, carry);
        self.regs.set_hl(res);
    }

    /// SP plus a signed immediate. Flags come from the unsigned low byte add.
    fn sp_offset(&mut self, offset: u8) -> u16 {
        let sp = self.regs.sp;
        let val = offset as i8 as i16 as u16;
        let half = (sp & 0x0F) + (val & 0x0F) > 0x0F;
        let carry = (sp & 0xFF) + (val & 0xFF) > 0xFF;
        self.set_flags(false, false, half, carry);
        sp.wrapping_add(val)
    }

    /// Rotate/shift/swap group, selected by opcode bits 3-5.
    fn shift(&mut self, op: u8, val: u8) -> u8 {
        let carry_in = self.regs.flag(FLAG_C) as u8;
        let (res, carry) = match (op >> 3) & 0x07 {
            0 => (val.rotate_left(1), val & 0x80 != 0),
            1 => (val.rotate_right(1), val & 0x01 != 0),
            2 => ((val << 1) | carry_in, val & 0x80 != 0),
            3 => ((val >> 1) | (carry_in << 7), val & 0x01 != 0),
            4 => (val << 1, val & 0x80 != 0),
            5 => ((val >> 1) | (val & 0x80), val & 0x01 != 0),
            6 => (val.rotate_left(4), false),
            _ => (val >> 1, val & 0x01 != 0),
        };
        self.set_flags(res == 0, false, false, carry);
        res
    }

    fn daa(&mut self) {
        let mut correction = 0u8;
        let mut carry = false;
        let subtract = self.regs.flag(FLAG_N);
        if self.regs.flag(FLAG_H) || (!subtract && (self.regs.a & 0x0F) > 9) {
            correction |= 0x06;
        }
        if self.regs.flag(FLAG_C) || (!subtract && self.regs.a > 0x99) {
            correction |= 0x60;
            carry = true;
        }
        self.regs.a = if subtract {
            self.regs.a.wrapping_sub(correction)
        } else {
            self.regs.a.wrapping_add(correction)
        };
        self.set_flags(self.regs.a == 0, subtract, false, carry);
    }

    fn execute_cb<B: MemoryBus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let opcode = self.fetch8(bus);
        let r = opcode & 0x07;
        let bit = (opcode >> 3) & 0x07;
        let val = self.read_operand(bus, r);
        match opcode {
            0x00..=0x3F => {
                let res = self.shift(opcode, val);
                self.write_operand(bus, r, res);
            }
            0x40..=0x7F => {
                let c = self.regs.flag(FLAG_C);
                self.set_flags(val & (1 << bit) == 0, false, true, c);
            }
            0x80..=0xBF => self.write_operand(bus, r, val & !(1 << bit)),
            _ => self.write_operand(bus, r, val | (1 << bit)),
        }
        cb_cycles(opcode)
    }

    fn execute_opcode<B: MemoryBus + ?Sized>(&mut self, opcode: u8, pc: u16, bus: &mut B) -> u32 {
        let mut cycles = OPCODE_CYCLES[opcode as usize] as u32;
        match opcode {
            0x00 => {}
            0x01 | 0x11 | 0x21 | 0x31 => {
                let val = self.fetch16(bus);
                self.regs.set16(Reg16::from_index_sp(opcode >> 4), val);
            }
            0x02 | 0x12 => {
                let addr = self.regs.get16(Reg16::from_index_sp(opcode >> 4));
                self.write8(bus, addr, self.regs.a);
            }
            0x0A | 0x1A => {
                let addr = self.regs.get16(Reg16::from_index_sp(opcode >> 4));
                self.regs.a = self.read8(bus, addr);
            }
            0x22 | 0x32 | 0x2A | 0x3A => {
                let addr = self.regs.hl();
                let next = if opcode & 0x10 == 0 {
                    addr.wrapping_add(1)
                } else {
                    addr.wrapping_sub(1)
                };
                self.regs.set_hl(next);
                if opcode & 0x08 == 0 {
                    self.write8(bus, addr, self.regs.a);
                } else {
                    self.regs.a = self.read8(bus, addr);
                }
            }
            0x03 | 0x13 | 0x23 | 0x33 => {
                let pair = Reg16::from_index_sp(opcode >> 4);
                self.regs.set16(pair, self.regs.get16(pair).wrapping_add(1));
            }
            0x0B | 0x1B | 0x2B | 0x3B => {
                let pair = Reg16::from_index_sp(opcode >> 4);
                self.regs.set16(pair, self.regs.get16(pair).wrapping_sub(1));
            }
            0x09 | 0x19 | 0x29 | 0x39 => {
                let val = self.regs.get16(Reg16::from_index_sp(opcode >> 4));
                self.add_hl(val);
            }
            op @ 0x00..=0x3F if op & 0x07 == 0x04 => {
                let r = (op >> 3) & 0x07;
                let val = self.read_operand(bus, r);
                let res = self.inc8(val);
                self.write_operand(bus, r, res);
            }
            op @ 0x00..=0x3F if op & 0x07 == 0x05 => {
                let r = (op >> 3) & 0x07;
                let val = self.read_operand(bus, r);
                let res = self.dec8(val);
                self.write_operand(bus, r, res);
            }
            op @ 0x00..=0x3F if op & 0x07 == 0x06 => {
                let val = self.fetch8(bus);
                self.write_operand(bus, (op >> 3) & 0x07, val);
            }
            0x07 | 0x0F | 0x17 | 0x1F => {
                // RLCA RRCA RLA RRA always clear Z.
                self.regs.a = self.shift(opcode, self.regs.a);
                self.regs.set_flag(FLAG_Z, false);
            }
            0x08 => {
                let addr = self.fetch16(bus);
                self.write8(bus, addr, self.regs.sp as u8);
                self.write8(bus, addr.wrapping_add(1), (self.regs.sp >> 8) as u8);
            }
            0x10 => {
                // STOP is two bytes long; the second is skipped without a
                // bus cycle. DIV resets as the instruction ends.
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.write8(bus, 0xFF04, 0);
                self.state = RunState::Stopped;
                if self.trace {
                    debug!("STOP at {pc:04X}");
                }
            }
            0x18 => {
                let offset = self.fetch8(bus) as i8;
                self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
            }
            0x20 | 0x28 | 0x30 | 0x38 => {
                let offset = self.fetch8(bus) as i8;
                if self.condition(opcode) {
                    self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
                    cycles += JR_TAKEN_CYCLES;
                }
            }
            0x27 => self.daa(),
            0x2F => {
                self.regs.a = !self.regs.a;
                self.regs.set_flag(FLAG_N, true);
                self.regs.set_flag(FLAG_H, true);
            }
            0x37 | 0x3F => {
                let carry = opcode == 0x37 || !self.regs.flag(FLAG_C);
                let z = self.regs.flag(FLAG_Z);
                self.set_flags(z, false, false, carry);
            }
            0x76 => self.halt(bus),
            0x40..=0x7F => {
                let val = self.read_operand(bus, opcode & 0x07);
                self.write_operand(bus, (opcode >> 3) & 0x07, val);
            }
            0x80..=0xBF => {
                let val = self.read_operand(bus, opcode & 0x07);
                self.alu(opcode >> 3, val);
            }
            0xC0 | 0xC8 | 0xD0 | 0xD8 => {
                self.idle();
                if self.condition(opcode) {
                    self.regs.pc = self.pop16(bus);
                    cycles += RET_TAKEN_CYCLES;
                }
            }
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let val = self.pop16(bus);
                self.regs.set16(Reg16::from_index_af((opcode >> 4) & 0x03), val);
            }
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                let val = self.regs.get16(Reg16::from_index_af((opcode >> 4) & 0x03));
                self.push16(bus, val);
            }
            0xC2 | 0xCA | 0xD2 | 0xDA => {
                let addr = self.fetch16(bus);
                if self.condition(opcode) {
                    self.regs.pc = addr;
                    cycles += JP_TAKEN_CYCLES;
                }
            }
            0xC3 => self.regs.pc = self.fetch16(bus),
            0xC4 | 0xCC | 0xD4 | 0xDC => {
                let addr = self.fetch16(bus);
                if self.condition(opcode) {
                    self.push16(bus, self.regs.pc);
                    self.regs.pc = addr;
                    cycles += CALL_TAKEN_CYCLES;
                }
            }
            0xCD => {
                let addr = self.fetch16(bus);
                self.push16(bus, self.regs.pc);
                self.regs.pc = addr;
            }
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let val = self.fetch8(bus);
                self.alu(opcode >> 3, val);
            }
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.push16(bus, self.regs.pc);
                self.regs.pc = (opcode & 0x38) as u16;
            }
            0xC9 => self.regs.pc = self.pop16(bus),
            0xD9 => {
                self.regs.pc = self.pop16(bus);
                self.ime = true;
            }
            0xCB => cycles = self.execute_cb(bus),
            0xE0 => {
                let addr = 0xFF00 | self.fetch8(bus) as u16;
                self.write8(bus, addr, self.regs.a);
            }
            0xF0 => {
                let addr = 0xFF00 | self.fetch8(bus) as u16;
                self.regs.a = self.read8(bus, addr);
            }
            0xE2 => self.write8(bus, 0xFF00 | self.regs.c as u16, self.regs.a),
            0xF2 => self.regs.a = self.read8(bus, 0xFF00 | self.regs.c as u16),
            0xE8 => {
                let offset = self.fetch8(bus);
                self.regs.sp = self.sp_offset(offset);
            }
            0xF8 => {
                let offset = self.fetch8(bus);
                let val = self.sp_offset(offset);
                self.regs.set_hl(val);
            }
            0xE9 => self.regs.pc = self.regs.hl(),
            0xF9 => self.regs.sp = self.regs.hl(),
            0xEA => {
                let addr = self.fetch16(bus);
                self.write8(bus, addr, self.regs.a);
            }
            0xFA => {
                let addr = self.fetch16(bus);
                self.regs.a = self.read8(bus, addr);
            }
            0xF3 => {
                self.ime = false;
                self.ime_enable_delay = 0;
            }
            0xFB => self.ime_enable_delay = 2,
            _ => panic!("unhandled opcode {opcode:02X} at PC={pc:04X}"),
        }
        cycles
    }

    fn halt<B: MemoryBus + ?Sized>(&mut self, bus: &mut B) {
        if self.ime || bus.interrupts().pending() == 0 {
            self.state = RunState::Halted;
        } else {
            // HALT falls straight through and the next opcode byte is read
            // twice.
            self.halt_bug = true;
            if self.trace {
                debug!("halt bug at PC={:04X}", self.regs.pc);
            }
        }
    }
}
