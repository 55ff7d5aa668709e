//! OAM DMA and CGB HDMA/GDMA transfer engines.
//!
//! The controller owns transfer state only. Every byte it moves is read and
//! written through a [`DmaBus`] supplied by the caller, so the memory map
//! stays in one place.

use log::{debug, trace};

const OAM_SIZE: u8 = 0xA0;
// DMA starts after two M-cycles (gbdev.io/pandocs/OAM_DMA_Transfer.html)
const OAM_DMA_STARTUP_CYCLES: u8 = 8;
const OAM_DMA_STEP_CYCLES: u8 = 4;
const HDMA_BLOCK_SIZE: u16 = 0x10;
/// Start of the region the CPU keeps while OAM DMA owns the bus.
const HIGH_BUS_START: u16 = 0xFF00;

/// Memory access granted to the DMA engines.
pub trait DmaBus {
    /// Read a source byte. Not subject to the OAM DMA bus lock.
    fn dma_read(&mut self, addr: u16) -> u8;

    /// Store byte `index` (0..0xA0) of OAM.
    fn write_oam(&mut self, index: u8, val: u8);

    /// Store a byte in the current VRAM bank, bypassing PPU mode checks.
    fn write_vram(&mut self, addr: u16, val: u8);
}

/// Transfer mode for CGB DMA operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HdmaMode {
    /// General DMA (immediate)
    General,
    /// HBlank DMA
    HBlank,
}

#[derive(Debug, Default)]
struct OamDma {
    /// Last value written to FF46.
    reg: u8,
    source: u16,
    /// Bytes copied by the running transfer.
    transferred: u8,
    /// T-cycles into the current byte slot.
    phase: u8,
    active: bool,
    /// T-cycles left before a requested transfer begins; 0 when none is
    /// pending.
    startup: u8,
    pending_source: u16,
    /// Set when a restart was requested while a transfer was running; keeps
    /// the bus locked through the new startup window.
    restarted: bool,
}

#[derive(Debug)]
struct HdmaState {
    /// 16-bit source pointer (upper 12 bits writable)
    src: u16,
    /// Destination in VRAM (0x8000 | (dst & 0x1FF0))
    dst: u16,
    /// Remaining 0x10-byte blocks (1-128 while active)
    blocks: u8,
    mode: HdmaMode,
    active: bool,
    /// HBlank transfer stopped by an FF55 write with bit 7 clear.
    stopped: bool,
    /// FF55 low bits reported after a stop.
    latched: u8,
}

pub struct Dma {
    oam: OamDma,
    hdma: HdmaState,
    cgb_mode: bool,
    trace: bool,
}

impl Dma {
    pub fn new(cgb_mode: bool, trace: bool) -> Self {
        Self {
            oam: OamDma::default(),
            hdma: HdmaState {
                src: 0,
                dst: sanitize_vram_dma_dest(0),
                blocks: 0,
                mode: HdmaMode::General,
                active: false,
                stopped: false,
                latched: 0,
            },
            cgb_mode,
            trace,
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF46 => self.oam.reg,
            0xFF51..=0xFF55 if !self.cgb_mode => 0xFF,
            0xFF51 => (self.hdma.src >> 8) as u8,
            0xFF52 => (self.hdma.src & 0x00F0) as u8,
            0xFF53 => ((self.hdma.dst & 0x1F00) >> 8) as u8,
            0xFF54 => (self.hdma.dst & 0x00F0) as u8,
            0xFF55 => {
                if self.hdma.active {
                    // Busy flag (bit 7) is cleared while the DMA is running.
                    self.hdma.blocks.wrapping_sub(1) & 0x7F
                } else if self.hdma.stopped {
                    0x80 | self.hdma.latched
                } else {
                    0xFF
                }
            }
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8, bus: &mut dyn DmaBus) {
        match addr {
            0xFF46 => self.start_oam_dma(val),
            0xFF51..=0xFF55 if !self.cgb_mode => {}
            0xFF51..=0xFF54 if self.hdma.active => {}
            0xFF51 => self.hdma.src = ((val as u16) << 8) | (self.hdma.src & 0x00FF),
            0xFF52 => self.hdma.src = (self.hdma.src & 0xFF00) | (val & 0xF0) as u16,
            0xFF53 => {
                let raw = (((val & 0x1F) as u16) << 8) | (self.hdma.dst & 0x00F0);
                self.hdma.dst = sanitize_vram_dma_dest(raw);
            }
            0xFF54 => {
                let raw = (self.hdma.dst & 0x1F00) | (val & 0xF0) as u16;
                self.hdma.dst = sanitize_vram_dma_dest(raw);
            }
            0xFF55 => self.write_hdma_control(val, bus),
            _ => {}
        }
    }

    fn start_oam_dma(&mut self, val: u8) {
        self.oam.reg = val;
        self.oam.pending_source = (val as u16) << 8;
        self.oam.startup = OAM_DMA_STARTUP_CYCLES;
        self.oam.restarted |= self.oam.active;
        if self.trace {
            debug!(
                "OAM DMA scheduled src={:04X} restart={}",
                self.oam.pending_source, self.oam.restarted
            );
        }
    }

    fn write_hdma_control(&mut self, val: u8, bus: &mut dyn DmaBus) {
        if self.hdma.active {
            if val & 0x80 == 0 {
                // Stop the running HBlank transfer; FF55 keeps reporting the
                // remaining length with bit 7 set.
                self.hdma.latched = self.hdma.blocks.wrapping_sub(1) & 0x7F;
                self.hdma.active = false;
                self.hdma.stopped = true;
                if self.trace {
                    debug!("HDMA stopped with {} blocks left", self.hdma.blocks);
                }
            } else if self.trace {
                trace!("HDMA restart ignored while active (FF55 <- {val:02X})");
            }
            return;
        }

        let requested_blocks = (val & 0x7F) + 1;
        self.hdma.stopped = false;
        if val & 0x80 == 0 {
            self.run_gdma(requested_blocks, bus);
        } else {
            self.hdma.mode = HdmaMode::HBlank;
            self.hdma.blocks = requested_blocks;
            self.hdma.active = true;
            if self.trace {
                debug!(
                    "HDMA armed src={:04X} dst={:04X} blocks={}",
                    self.hdma.src, self.hdma.dst, requested_blocks
                );
            }
        }
    }

    /// Perform a General DMA transfer immediately.
    fn run_gdma(&mut self, blocks: u8, bus: &mut dyn DmaBus) {
        self.hdma.mode = HdmaMode::General;
        if self.trace {
            debug!(
                "GDMA src={:04X} dst={:04X} blocks={}",
                self.hdma.src, self.hdma.dst, blocks
            );
        }
        for _ in 0..blocks {
            self.transfer_block(bus);
        }
        self.hdma.blocks = 0;
        self.hdma.active = false;
    }

    /// Execute a single 0x10-byte HDMA burst for one H-Blank.
    ///
    /// Returns whether a block was transferred.
    pub fn hblank_step(&mut self, bus: &mut dyn DmaBus) -> bool {
        if !(self.hdma.active && self.hdma.mode == HdmaMode::HBlank) {
            return false;
        }
        self.transfer_block(bus);
        self.hdma.blocks -= 1;
        if self.hdma.blocks == 0 {
            self.hdma.active = false;
            if self.trace {
                debug!("HDMA complete");
            }
        }
        true
    }

    fn transfer_block(&mut self, bus: &mut dyn DmaBus) {
        for _ in 0..HDMA_BLOCK_SIZE {
            let byte = bus.dma_read(self.hdma.src);
            bus.write_vram(self.hdma.dst, byte);
            self.hdma.src = self.hdma.src.wrapping_add(1);
            self.hdma.dst = 0x8000 | (self.hdma.dst.wrapping_add(1) & 0x1FFF);
        }
    }

    /// Advance OAM DMA by `cycles` T-cycles.
    pub fn tick(&mut self, cycles: u32, bus: &mut dyn DmaBus) {
        for _ in 0..cycles {
            if !self.oam.active && self.oam.startup == 0 {
                return;
            }
            self.tick_oam(bus);
        }
    }

    fn tick_oam(&mut self, bus: &mut dyn DmaBus) {
        // A running transfer keeps copying while a restart warms up.
        if self.oam.active {
            self.oam.phase += 1;
            if self.oam.phase == OAM_DMA_STEP_CYCLES {
                self.oam.phase = 0;
                let idx = self.oam.transferred;
                let byte = bus.dma_read(self.oam.source.wrapping_add(idx as u16));
                bus.write_oam(idx, byte);
                self.oam.transferred += 1;
                if self.oam.transferred == OAM_SIZE {
                    self.oam.active = false;
                    if self.trace {
                        debug!("OAM DMA from {:04X} complete", self.oam.source);
                    }
                }
            }
        }

        if self.oam.startup > 0 {
            self.oam.startup -= 1;
            if self.oam.startup == 0 {
                self.oam.source = self.oam.pending_source;
                self.oam.transferred = 0;
                self.oam.phase = 0;
                self.oam.active = true;
                self.oam.restarted = false;
                if self.trace {
                    debug!("OAM DMA started src={:04X}", self.oam.source);
                }
            }
        }
    }

    /// Whether a CPU access to `addr` is blocked by OAM DMA.
    #[inline]
    pub fn is_bus_locked(&self, addr: u16) -> bool {
        addr < HIGH_BUS_START && (self.oam.active || self.oam.restarted)
    }

    /// Return true if an OAM DMA transfer is running or about to start.
    pub fn oam_dma_active(&self) -> bool {
        self.oam.active || self.oam.startup > 0
    }

    /// Bytes copied so far by the running OAM DMA transfer.
    pub fn oam_bytes_transferred(&self) -> u8 {
        self.oam.transferred
    }

    pub fn hdma_active(&self) -> bool {
        self.hdma.active
    }

    pub(crate) fn trace_enabled(&self) -> bool {
        self.trace
    }
}

#[inline]
fn sanitize_vram_dma_dest(addr: u16) -> u16 {
    0x8000 | (addr & 0x1FF0)
}
