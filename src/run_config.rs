use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use gbtick_core::{CoreConfig, DmgRevision, TraceConfig};

use crate::RunError;

/// One second of emulated time at normal speed.
pub const DEFAULT_CYCLES: u64 = 4_194_304;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelChoice {
    #[default]
    Dmg,
    Cgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RevisionChoice {
    Rev0,
    RevA,
    RevB,
    #[default]
    RevC,
}

impl From<RevisionChoice> for DmgRevision {
    fn from(choice: RevisionChoice) -> Self {
        match choice {
            RevisionChoice::Rev0 => DmgRevision::Rev0,
            RevisionChoice::RevA => DmgRevision::RevA,
            RevisionChoice::RevB => DmgRevision::RevB,
            RevisionChoice::RevC => DmgRevision::RevC,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TraceOptions {
    pub cpu: bool,
    pub dma: bool,
    pub timer: bool,
    pub serial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub model: ModelChoice,
    pub dmg_revision: RevisionChoice,
    /// T-cycle budget for the run.
    pub cycles: u64,
    /// Stop early once the serial output contains this text.
    pub until_serial: Option<String>,
    /// Echo every serial byte back instead of receiving 0xFF.
    pub serial_loopback: bool,
    /// Print the register state after the run.
    pub show_registers: bool,
    pub trace: TraceOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: ModelChoice::default(),
            dmg_revision: RevisionChoice::default(),
            cycles: DEFAULT_CYCLES,
            until_serial: None,
            serial_loopback: false,
            show_registers: false,
            trace: TraceOptions::default(),
        }
    }
}

impl RunConfig {
    pub fn core_config(&self) -> CoreConfig {
        let base = match self.model {
            ModelChoice::Dmg => CoreConfig::dmg(),
            ModelChoice::Cgb => CoreConfig::cgb(),
        };
        base.with_revision(self.dmg_revision.into())
            .with_trace(TraceConfig {
                cpu: self.trace.cpu,
                dma: self.trace.dma,
                timer: self.trace.timer,
                serial: self.trace.serial,
            })
    }

    /// Parse a config file that the user asked for explicitly.
    pub fn load(path: &Path) -> Result<Self, RunError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

pub fn default_run_config_path() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("gbtick").join("run.toml");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("gbtick")
            .join("run.toml");
    }

    PathBuf::from("run.toml")
}

/// Load the config at `path`, falling back to defaults when it is missing or
/// malformed.
pub fn load_or_default(path: &Path) -> RunConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return RunConfig::default(),
    };

    match toml::from_str::<RunConfig>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Failed to parse run config {}: {e}; using defaults",
                path.display()
            );
            RunConfig::default()
        }
    }
}
