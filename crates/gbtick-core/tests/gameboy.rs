mod common;

use common::{image_with, machine};
use gbtick_core::{CoreConfig, GameBoy, Model, bus::MemoryBus, mmu::MmuError};

// Writes "Hi" to the serial port, waiting for each transfer to finish.
const HELLO: &[u8] = &[
    0x3E, b'H', // LD A,'H'
    0xCD, 0x00, 0x02, // CALL 0200
    0x3E, b'i', // LD A,'i'
    0xCD, 0x00, 0x02, // CALL 0200
    0x18, 0xFE, // JR -2
];

const SEND: &[u8] = &[
    0xE0, 0x01, // LDH (SB),A
    0x3E, 0x81, // LD A,81
    0xE0, 0x02, // LDH (SC),A
    0xF0, 0x02, // LDH A,(SC)
    0xCB, 0x7F, // BIT 7,A
    0x20, 0xFA, // JR NZ,-6
    0xC9, // RET
];

fn hello_machine(config: CoreConfig) -> GameBoy {
    let mut rom = image_with(HELLO);
    rom[0x0200..0x0200 + SEND.len()].copy_from_slice(SEND);
    let mut gb = GameBoy::new(config);
    gb.load_program(&rom).unwrap();
    gb
}

#[test]
fn run_cycles_overshoots_by_at_most_one_step() {
    let mut gb = machine(&[0x00; 8]);
    let elapsed = gb.run_cycles(100);
    assert!((100..100 + 24).contains(&elapsed));
    assert_eq!(gb.cpu.cycles, elapsed);
    assert_eq!(gb.run_cycles(0), 0);
}

#[test]
fn serial_console_program() {
    let mut gb = hello_machine(CoreConfig::dmg());
    // Each byte takes 8 periods of 512 T in normal clock mode.
    gb.run_cycles(3 * 4096);
    assert_eq!(gb.mmu.take_serial(), b"Hi");
    assert!(gb.mmu.take_serial().is_empty());
}

#[test]
fn reset_keeps_program() {
    let mut gb = hello_machine(CoreConfig::dmg());
    gb.run_cycles(5000);
    gb.mmu.write(0xC000, 0x99);
    gb.reset();

    assert_eq!(gb.cpu.regs.pc, 0x0100);
    assert_eq!(gb.cpu.cycles, 0);
    assert_eq!(gb.mmu.peek(0xC000), 0x00);
    assert_eq!(gb.mmu.peek(0x0100), 0x3E);
    assert!(gb.mmu.serial.peek_output().is_empty());

    gb.run_cycles(3 * 4096);
    assert_eq!(gb.mmu.take_serial(), b"Hi");
}

#[test]
fn oversized_program_rejected() {
    let mut gb = GameBoy::default();
    let err = gb.load_program(&vec![0; 0x8001]).unwrap_err();
    assert_eq!(
        err,
        MmuError::ImageTooLarge {
            len: 0x8001,
            max: 0x8000
        }
    );
    assert_eq!(
        err.to_string(),
        "program image is 32769 bytes, larger than the 32768-byte ROM window"
    );
}

#[test]
fn hblank_through_facade() {
    let mut gb = GameBoy::new(CoreConfig::cgb());
    assert_eq!(gb.config().model, Model::Cgb);
    gb.mmu.write(0xC000, 0x42);
    gb.mmu.write(0xFF51, 0xC0);
    gb.mmu.write(0xFF52, 0x00);
    gb.mmu.write(0xFF53, 0x80);
    gb.mmu.write(0xFF54, 0x00);
    gb.mmu.write(0xFF55, 0x80);

    assert!(gb.hblank());
    assert_eq!(gb.mmu.vram(0)[0], 0x42);
    assert!(!gb.hblank());
}

#[test]
fn dmg_facade_has_no_hdma() {
    let mut gb = GameBoy::default();
    assert_eq!(gb.config().model, Model::Dmg);
    assert!(!gb.hblank());
}
