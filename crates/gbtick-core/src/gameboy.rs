use crate::{
    config::CoreConfig,
    cpu::Cpu,
    mmu::{Mmu, MmuError},
};

pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
    config: CoreConfig,
}

impl GameBoy {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            cpu: Cpu::new(&config),
            mmu: Mmu::new(config),
            config,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn load_program(&mut self, image: &[u8]) -> Result<(), MmuError> {
        self.mmu.load_program(image)
    }

    /// Run one CPU step and clock the peripherals by the same amount.
    pub fn step(&mut self) -> u32 {
        let cycles = self.cpu.step(&mut self.mmu);
        self.mmu.tick(cycles);
        cycles
    }

    /// Step until at least `cycles` T-cycles have elapsed. Returns the exact
    /// number consumed, which overshoots by at most one step.
    pub fn run_cycles(&mut self, cycles: u64) -> u64 {
        let mut elapsed = 0u64;
        while elapsed < cycles {
            elapsed += self.step() as u64;
        }
        elapsed
    }

    /// Deliver one H-Blank to the HDMA engine.
    pub fn hblank(&mut self) -> bool {
        self.mmu.hblank()
    }

    /// Reset to the post-boot state while preserving the loaded program.
    pub fn reset(&mut self) {
        let rom = std::mem::take(&mut self.mmu.mem.rom);
        self.cpu = Cpu::new(&self.config);
        self.mmu = Mmu::new(self.config);
        self.mmu.mem.rom = rom;
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new(CoreConfig::default())
    }
}
