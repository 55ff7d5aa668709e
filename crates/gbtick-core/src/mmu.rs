use log::trace;
use thiserror::Error;

use crate::{
    bus::MemoryBus,
    config::CoreConfig,
    dma::{Dma, DmaBus},
    hardware::boot_divider,
    interrupts::InterruptController,
    serial::Serial,
    timer::Timer,
};

/// Largest flat program image: both 16 KiB ROM banks, no mapper.
pub const ROM_SIZE: usize = 0x8000;
const VRAM_BANK_SIZE: usize = 0x2000;
const WRAM_BANK_SIZE: usize = 0x1000;
const ERAM_SIZE: usize = 0x2000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MmuError {
    #[error("program image is {len} bytes, larger than the {max}-byte ROM window")]
    ImageTooLarge { len: usize, max: usize },
}

/// Backing storage for every memory region, kept apart from the I/O units so
/// the DMA engines can borrow it while the Mmu drives them.
pub(crate) struct Memory {
    pub(crate) rom: Vec<u8>,
    pub(crate) vram: [[u8; VRAM_BANK_SIZE]; 2],
    pub(crate) vram_bank: usize,
    eram: [u8; ERAM_SIZE],
    pub(crate) wram: [[u8; WRAM_BANK_SIZE]; 8],
    pub(crate) wram_bank: usize,
    pub(crate) oam: [u8; 0xA0],
    pub(crate) hram: [u8; 0x7F],
}

impl Memory {
    fn new() -> Self {
        Self {
            rom: vec![0xFF; ROM_SIZE],
            vram: [[0; VRAM_BANK_SIZE]; 2],
            vram_bank: 0,
            eram: [0xFF; ERAM_SIZE],
            wram: [[0; WRAM_BANK_SIZE]; 8],
            wram_bank: 1,
            oam: [0; 0xA0],
            hram: [0; 0x7F],
        }
    }

    /// Read a byte from a storage region. I/O registers and IE are handled
    /// by the Mmu.
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF => self.rom[addr as usize],
            0x8000..=0x9FFF => self.vram[self.vram_bank][(addr - 0x8000) as usize],
            0xA000..=0xBFFF => self.eram[(addr - 0xA000) as usize],
            0xC000..=0xCFFF => self.wram[0][(addr - 0xC000) as usize],
            0xD000..=0xDFFF => self.wram[self.wram_bank][(addr - 0xD000) as usize],
            0xE000..=0xFDFF => self.read(addr - 0x2000),
            0xFE00..=0xFE9F => self.oam[(addr - 0xFE00) as usize],
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            _ => 0xFF,
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        match addr {
            // No mapper: ROM writes are dropped.
            0x0000..=0x7FFF => {}
            0x8000..=0x9FFF => self.vram[self.vram_bank][(addr - 0x8000) as usize] = val,
            0xA000..=0xBFFF => self.eram[(addr - 0xA000) as usize] = val,
            0xC000..=0xCFFF => self.wram[0][(addr - 0xC000) as usize] = val,
            0xD000..=0xDFFF => self.wram[self.wram_bank][(addr - 0xD000) as usize] = val,
            0xE000..=0xFDFF => self.write(addr - 0x2000, val),
            0xFE00..=0xFE9F => self.oam[(addr - 0xFE00) as usize] = val,
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            _ => {}
        }
    }
}

impl DmaBus for Memory {
    fn dma_read(&mut self, addr: u16) -> u8 {
        // Sources at E000 and above fold onto the WRAM echo.
        let addr = if addr >= 0xE000 { addr - 0x2000 } else { addr };
        self.read(addr)
    }

    fn write_oam(&mut self, index: u8, val: u8) {
        self.oam[index as usize] = val;
    }

    fn write_vram(&mut self, addr: u16, val: u8) {
        self.vram[self.vram_bank][(addr & 0x1FFF) as usize] = val;
    }
}

/// Flat memory map with the timer, serial port, interrupt controller and DMA
/// engines attached at their I/O addresses.
///
/// Regions without an attached unit (PPU, APU, joypad registers) read 0xFF
/// and ignore writes.
pub struct Mmu {
    pub(crate) mem: Memory,
    pub interrupts: InterruptController,
    pub timer: Timer,
    pub serial: Serial,
    pub dma: Dma,
    cgb_mode: bool,
    /// T-cycles of the current CPU step already applied by `sync`.
    synced: u32,
}

impl Mmu {
    pub fn new(config: CoreConfig) -> Self {
        let cgb = config.model.is_cgb();
        let mut timer = Timer::with_trace(config.trace.timer);
        timer.div = boot_divider(config.dmg_revision);
        Self {
            mem: Memory::new(),
            interrupts: InterruptController::post_boot(),
            timer,
            serial: Serial::with_trace(cgb, config.trace.serial),
            dma: Dma::new(cgb, config.trace.dma),
            cgb_mode: cgb,
            synced: 0,
        }
    }

    /// Copy a program image into the ROM window starting at 0x0000. Bytes
    /// past the end of the image read 0xFF.
    pub fn load_program(&mut self, image: &[u8]) -> Result<(), MmuError> {
        if image.len() > ROM_SIZE {
            return Err(MmuError::ImageTooLarge {
                len: image.len(),
                max: ROM_SIZE,
            });
        }
        self.mem.rom.fill(0xFF);
        self.mem.rom[..image.len()].copy_from_slice(image);
        Ok(())
    }

    /// Finish a CPU step of `cycles` T-cycles. Whatever part of it was
    /// already applied by [`MemoryBus::sync`] is not clocked twice.
    pub fn tick(&mut self, cycles: u32) {
        let remaining = cycles.saturating_sub(self.synced);
        self.synced = 0;
        self.advance(remaining);
    }

    fn advance(&mut self, cycles: u32) {
        if cycles == 0 {
            return;
        }
        let prev_div = self.timer.div;
        self.timer.step(cycles, &mut self.interrupts);
        self.dma.tick(cycles, &mut self.mem);
        self.serial.step(prev_div, self.timer.div, &mut self.interrupts);
    }

    /// Notify the HDMA engine that the PPU entered H-Blank.
    pub fn hblank(&mut self) -> bool {
        self.dma.hblank_step(&mut self.mem)
    }

    pub fn oam(&self) -> &[u8; 0xA0] {
        &self.mem.oam
    }

    /// Contents of VRAM bank `bank` (0 or 1).
    pub fn vram(&self, bank: usize) -> &[u8; VRAM_BANK_SIZE] {
        &self.mem.vram[bank & 1]
    }

    pub fn take_serial(&mut self) -> Vec<u8> {
        self.serial.take_output()
    }

    fn read_inner(&self, addr: u16) -> u8 {
        match addr {
            0xFF01 | 0xFF02 => self.serial.read(addr),
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => self.interrupts.read_if(),
            0xFF46 | 0xFF51..=0xFF55 => self.dma.read(addr),
            0xFF4F if self.cgb_mode => 0xFE | self.mem.vram_bank as u8,
            0xFF70 if self.cgb_mode => 0xF8 | self.mem.wram_bank as u8,
            0xFFFF => self.interrupts.read_ie(),
            0xFF00..=0xFF7F => 0xFF,
            _ => self.mem.read(addr),
        }
    }

    fn write_inner(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF01 | 0xFF02 => self.serial.write(addr, val),
            0xFF04..=0xFF07 => self.timer.write(addr, val),
            0xFF0F => self.interrupts.write_if(val),
            0xFF46 | 0xFF51..=0xFF55 => self.dma.write(addr, val, &mut self.mem),
            0xFF4F if self.cgb_mode => self.mem.vram_bank = (val & 0x01) as usize,
            0xFF70 if self.cgb_mode => {
                let bank = (val & 0x07) as usize;
                self.mem.wram_bank = if bank == 0 { 1 } else { bank };
            }
            0xFFFF => self.interrupts.write_ie(val),
            0xFF00..=0xFF7F => {}
            _ => self.mem.write(addr, val),
        }
    }
}

impl MemoryBus for Mmu {
    fn read(&mut self, addr: u16) -> u8 {
        if self.dma.is_bus_locked(addr) {
            if self.dma.trace_enabled() {
                trace!("read {addr:04X} blocked by OAM DMA");
            }
            return 0xFF;
        }
        self.read_inner(addr)
    }

    fn write(&mut self, addr: u16, val: u8) {
        if self.dma.is_bus_locked(addr) {
            if self.dma.trace_enabled() {
                trace!("write {addr:04X} <- {val:02X} blocked by OAM DMA");
            }
            return;
        }
        self.write_inner(addr, val);
    }

    fn peek(&self, addr: u16) -> u8 {
        self.read_inner(addr)
    }

    fn sync(&mut self, offset: u32) {
        if offset > self.synced {
            self.advance(offset - self.synced);
            self.synced = offset;
        }
    }

    fn interrupts(&mut self) -> &mut InterruptController {
        &mut self.interrupts
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new(CoreConfig::default())
    }
}
