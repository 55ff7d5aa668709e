use clap::Parser;
use std::path::PathBuf;

use crate::run_config::{ModelChoice, RevisionChoice, RunConfig};

/// Run a flat SM83 program image on the gbtick timing core.
#[derive(Parser, Debug)]
#[command(name = "gbtick", version)]
pub struct Args {
    /// Path to the program image (at most 32 KiB, entry point 0x0100)
    pub program: PathBuf,

    /// Run configuration file (defaults to $XDG_CONFIG_HOME/gbtick/run.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Force DMG mode
    #[arg(long, conflicts_with = "cgb")]
    pub dmg: bool,

    /// Force CGB mode
    #[arg(long, conflicts_with = "dmg")]
    pub cgb: bool,

    /// DMG hardware revision
    #[arg(long, value_enum)]
    pub revision: Option<RevisionChoice>,

    /// Number of T-cycles to run
    #[arg(long)]
    pub cycles: Option<u64>,

    /// Stop once the serial output contains this text
    #[arg(long)]
    pub until_serial: Option<String>,

    /// Echo serial bytes back instead of reading an idle line
    #[arg(long)]
    pub loopback: bool,

    /// Print the register state after the run
    #[arg(long)]
    pub debug: bool,

    /// Log every executed instruction
    #[arg(long)]
    pub trace_cpu: bool,

    /// Log DMA scheduling and blocked accesses
    #[arg(long)]
    pub trace_dma: bool,

    /// Log timer overflows and reloads
    #[arg(long)]
    pub trace_timer: bool,

    /// Log completed serial transfers
    #[arg(long)]
    pub trace_serial: bool,
}

impl Args {
    /// Flags given on the command line take precedence over the file.
    pub fn apply(&self, cfg: &mut RunConfig) {
        if self.dmg {
            cfg.model = ModelChoice::Dmg;
        } else if self.cgb {
            cfg.model = ModelChoice::Cgb;
        }
        if let Some(revision) = self.revision {
            cfg.dmg_revision = revision;
        }
        if let Some(cycles) = self.cycles {
            cfg.cycles = cycles;
        }
        if let Some(text) = &self.until_serial {
            cfg.until_serial = Some(text.clone());
        }
        cfg.serial_loopback |= self.loopback;
        cfg.show_registers |= self.debug;
        cfg.trace.cpu |= self.trace_cpu;
        cfg.trace.dma |= self.trace_dma;
        cfg.trace.timer |= self.trace_timer;
        cfg.trace.serial |= self.trace_serial;
    }
}
