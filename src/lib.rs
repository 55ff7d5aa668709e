//! Headless driver for the gbtick timing core: configuration, program
//! loading and the run loop behind the `gbtick` binary.

pub mod cli;
pub mod run_config;

use log::{debug, info};
use std::path::Path;
use thiserror::Error;

use gbtick_core::{GameBoy, mmu::MmuError, serial::NullLinkPort};

use run_config::RunConfig;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid run config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("cannot load program: {0}")]
    Program(#[from] MmuError),
}

/// Outcome of one run.
#[derive(Debug)]
pub struct RunReport {
    pub cycles: u64,
    pub serial: Vec<u8>,
    /// True when `until_serial` matched before the budget ran out.
    pub matched: bool,
    pub registers: String,
}

/// Build a machine for `cfg` with `image` loaded at 0x0000.
pub fn build_machine(cfg: &RunConfig, image: &[u8]) -> Result<GameBoy, RunError> {
    let mut gb = GameBoy::new(cfg.core_config());
    gb.load_program(image)?;
    if cfg.serial_loopback {
        gb.mmu.serial.connect(Box::new(NullLinkPort::new(true)));
    }
    Ok(gb)
}

pub fn run_image(cfg: &RunConfig, image: &[u8]) -> Result<RunReport, RunError> {
    let mut gb = build_machine(cfg, image)?;
    info!(
        "Running {} bytes in {:?} mode for {} cycles",
        image.len(),
        cfg.model,
        cfg.cycles
    );

    let mut serial = Vec::new();
    let mut elapsed = 0u64;
    let mut matched = false;
    while elapsed < cfg.cycles {
        elapsed += gb.step() as u64;
        if gb.mmu.serial.peek_output().is_empty() {
            continue;
        }
        serial.extend(gb.mmu.take_serial());
        if let Some(needle) = &cfg.until_serial
            && contains(&serial, needle.as_bytes())
        {
            debug!("serial output matched {needle:?} after {elapsed} cycles");
            matched = true;
            break;
        }
    }

    Ok(RunReport {
        cycles: elapsed,
        serial,
        matched,
        registers: gb.cpu.debug_state(),
    })
}

pub fn run_file(cfg: &RunConfig, path: &Path) -> Result<RunReport, RunError> {
    let image = std::fs::read(path)?;
    run_image(cfg, &image)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

/// Render captured serial bytes, escaping anything unprintable.
pub fn format_serial(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if b.is_ascii_graphic() || b == b' ' || b == b'\n' {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\x{b:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_escapes() {
        assert_eq!(format_serial(b"ok 1\n\x00"), "ok 1\n\\x00");
    }

    #[test]
    fn substring_match() {
        assert!(contains(b"Passed\n", b"Passed"));
        assert!(!contains(b"Pass", b"Passed"));
        assert!(contains(b"", b""));
    }
}
