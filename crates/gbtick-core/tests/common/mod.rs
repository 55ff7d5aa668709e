#![allow(dead_code)]

use gbtick_core::{CoreConfig, GameBoy, mmu::ROM_SIZE};

/// Entry point of a post-boot program.
pub const PROGRAM_START: usize = 0x0100;

/// Build a full ROM image with `code` placed at the post-boot entry point.
/// Everything else is NOP.
pub fn image_with(code: &[u8]) -> Vec<u8> {
    let mut rom = vec![0x00; ROM_SIZE];
    rom[PROGRAM_START..PROGRAM_START + code.len()].copy_from_slice(code);
    rom
}

/// Place `code` at an arbitrary address of an image, e.g. an interrupt
/// vector.
pub fn patch(rom: &mut [u8], addr: u16, code: &[u8]) {
    let start = addr as usize;
    rom[start..start + code.len()].copy_from_slice(code);
}

pub fn machine_with_image(config: CoreConfig, rom: &[u8]) -> GameBoy {
    let mut gb = GameBoy::new(config);
    gb.load_program(rom).expect("test image fits the ROM window");
    gb
}

/// DMG machine running `code` from 0x0100.
pub fn machine(code: &[u8]) -> GameBoy {
    machine_with_image(CoreConfig::dmg(), &image_with(code))
}

pub fn cgb_machine(code: &[u8]) -> GameBoy {
    machine_with_image(CoreConfig::cgb(), &image_with(code))
}

/// Step until PC reaches `addr`, failing after `max_steps`.
pub fn run_until_pc(gb: &mut GameBoy, addr: u16, max_steps: usize) {
    for _ in 0..max_steps {
        if gb.cpu.regs.pc == addr && !gb.cpu.dispatching() {
            return;
        }
        gb.step();
    }
    panic!(
        "PC never reached {addr:04X} within {max_steps} steps: {}",
        gb.cpu.debug_state()
    );
}
