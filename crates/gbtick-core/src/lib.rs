//! Cycle-exact SM83 timing core.
//!
//! This crate models the parts of the handheld that share one clock: the CPU,
//! the interrupt controller, the divider/timer and the OAM/HDMA transfer
//! engines. Video, audio and cartridge mappers are outside of it; a flat
//! reference memory map ([`mmu::Mmu`]) stands in for them. Hosts drive the
//! core through the [`gameboy`] facade.

/// CPU view of the address space.
pub mod bus;

/// Construction-time configuration and trace toggles.
pub mod config;

/// SM83 CPU core.
pub mod cpu;

/// OAM DMA and CGB HDMA engines.
pub mod dma;

/// High-level facade that wires the CPU and MMU into a single machine.
pub mod gameboy;

/// Hardware models, revisions and their power-on state.
pub mod hardware;

/// IE/IF register pair.
pub mod interrupts;

/// Flat reference memory map.
pub mod mmu;

/// Register file.
pub mod registers;

/// Serial unit and link cable plumbing.
pub mod serial;

/// Divider/timer unit.
pub mod timer;

pub use config::{CoreConfig, TraceConfig};
pub use gameboy::GameBoy;
pub use hardware::{DmgRevision, Model};
