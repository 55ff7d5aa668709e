mod common;

use common::{image_with, machine, machine_with_image, patch};
use gbtick_core::{CoreConfig, bus::MemoryBus, interrupts::Interrupt};

fn arm(gb: &mut gbtick_core::GameBoy, ie: u8, if_reg: u8) {
    gb.mmu.interrupts.write_ie(ie);
    gb.mmu.interrupts.write_if(if_reg);
}

#[test]
fn dispatch_takes_five_m_cycles() {
    let mut gb = machine(&[0xFB, 0x00, 0x00]);
    arm(&mut gb, 0x05, 0x05);
    gb.step();
    gb.step();
    assert!(gb.cpu.ime);

    for stage in 0..4 {
        assert_eq!(gb.step(), 4);
        assert!(gb.cpu.dispatching(), "stage {stage}");
        assert_eq!(gb.cpu.regs.pc, 0x0102);
        assert!(!gb.cpu.ime);
    }
    // The IF bit is acknowledged with the low-byte push.
    assert!(!gb.mmu.interrupts.is_requested(Interrupt::VBlank));
    assert!(gb.mmu.interrupts.is_requested(Interrupt::Timer));

    assert_eq!(gb.step(), 4);
    assert!(!gb.cpu.dispatching());
    assert_eq!(gb.cpu.regs.pc, 0x0040);
    assert_eq!(gb.cpu.regs.sp, 0xFFFC);
    assert_eq!(gb.mmu.peek(0xFFFD), 0x01);
    assert_eq!(gb.mmu.peek(0xFFFC), 0x02);
}

#[test]
fn lowest_bit_has_priority() {
    for (pending, vector) in [
        (0x1Fu8, 0x40u16),
        (0x1E, 0x48),
        (0x1C, 0x50),
        (0x18, 0x58),
        (0x10, 0x60),
    ] {
        let mut gb = machine(&[0xFB, 0x00]);
        arm(&mut gb, 0x1F, pending);
        for _ in 0..2 + 5 {
            gb.step();
        }
        assert_eq!(gb.cpu.regs.pc, vector, "IF={pending:02X}");
        assert_eq!(
            gb.mmu.peek(0xFF0F) & 0x1F,
            pending & (pending - 1),
            "only the dispatched bit clears"
        );
    }
}

#[test]
fn disabled_sources_are_not_dispatched() {
    let mut gb = machine(&[0xFB, 0x00, 0x00, 0x00]);
    arm(&mut gb, Interrupt::Joypad.mask(), 0x0F);
    for _ in 0..4 {
        gb.step();
        assert!(!gb.cpu.dispatching());
    }
    assert_eq!(gb.cpu.regs.pc, 0x0104);
}

#[test]
fn ie_push_cancels_dispatch() {
    let mut gb = machine(&[
        0x31, 0x00, 0x00, // LD SP,0000
        0xFB, // EI
        0x00, // NOP
    ]);
    arm(&mut gb, Interrupt::Timer.mask(), Interrupt::Timer.mask());
    for _ in 0..3 {
        gb.step();
    }
    assert_eq!(gb.cpu.regs.pc, 0x0105);

    // The high byte of the return address (0x01) lands in IE and disables
    // the timer source before it is acknowledged.
    for _ in 0..5 {
        gb.step();
    }
    assert_eq!(gb.mmu.interrupts.read_ie(), 0x01);
    assert_eq!(gb.cpu.regs.pc, 0x0000);
    assert_eq!(gb.cpu.regs.sp, 0xFFFE);
    assert_eq!(gb.mmu.peek(0xFFFE), 0x05);
    assert!(gb.mmu.interrupts.is_requested(Interrupt::Timer));
}

#[test]
fn ie_push_redirects_dispatch() {
    let mut rom = image_with(&[0xC3, 0x00, 0x02]); // JP 0200
    patch(
        &mut rom,
        0x0200,
        &[
            0x31, 0x00, 0x00, // LD SP,0000
            0xFB, // EI
            0x00, // NOP
        ],
    );
    let mut gb = machine_with_image(CoreConfig::dmg(), &rom);
    arm(&mut gb, Interrupt::Timer.mask(), 0x06);
    for _ in 0..4 + 5 {
        gb.step();
    }
    // IE became 0x02: STAT wins over the timer that started the dispatch.
    assert_eq!(gb.cpu.regs.pc, 0x0048);
    assert!(!gb.mmu.interrupts.is_requested(Interrupt::LcdStat));
    assert!(gb.mmu.interrupts.is_requested(Interrupt::Timer));
}

#[test]
fn halt_with_ime_wakes_then_dispatches() {
    let mut gb = machine(&[0xFB, 0x00, 0x76, 0x00]);
    arm(&mut gb, Interrupt::Timer.mask(), 0);
    for _ in 0..3 {
        gb.step();
    }
    assert!(gb.cpu.halted());

    gb.mmu.interrupts.request(Interrupt::Timer);
    assert_eq!(gb.step(), 4);
    assert!(!gb.cpu.halted());
    assert!(!gb.cpu.dispatching());
    for _ in 0..5 {
        gb.step();
    }
    assert_eq!(gb.cpu.regs.pc, 0x0050);
    assert_eq!(gb.mmu.peek(0xFFFC), 0x03);
}

#[test]
fn timer_interrupt_end_to_end() {
    let mut rom = image_with(&[
        0x3E, 0x05, // LD A,05
        0xE0, 0x07, // LDH (TAC),A
        0x3E, 0x04, // LD A,04
        0xE0, 0xFF, // LDH (IE),A
        0xAF, // XOR A
        0xE0, 0x0F, // LDH (IF),A
        0xE0, 0x05, // LDH (TIMA),A
        0x3E, 0xF0, // LD A,F0
        0xE0, 0x06, // LDH (TMA),A
        0xFB, // EI
        0x76, // HALT
        0x18, 0xFD, // JR -3
    ]);
    patch(&mut rom, 0x0050, &[0x04, 0xD9]); // INC B; RETI
    let mut gb = machine_with_image(CoreConfig::dmg(), &rom);
    let b = gb.cpu.regs.b;

    // First overflow after 256 TIMA increments of 16 T, then one every 16.
    gb.run_cycles(256 * 16 + 16 * 16 * 3 + 200);
    let fired = gb.cpu.regs.b.wrapping_sub(b);
    assert!((3..=5).contains(&fired), "fired {fired} times");
}
