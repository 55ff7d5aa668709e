use crate::hardware::{DmgRevision, Model};

/// Diagnostic output toggles.
///
/// Each flag routes verbose output for one unit through the `log` facade at
/// `trace` level. Nothing is printed unless the host installs a logger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TraceConfig {
    /// Log every executed instruction with the register state before it.
    pub cpu: bool,
    /// Log OAM DMA / HDMA scheduling, blocked CPU accesses and completions.
    pub dma: bool,
    /// Log TIMA overflows, reloads and register writes racing the reload.
    pub timer: bool,
    /// Log completed serial transfers.
    pub serial: bool,
}

/// Construction-time configuration of the timing core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CoreConfig {
    pub model: Model,
    pub dmg_revision: DmgRevision,
    pub trace: TraceConfig,
}

impl CoreConfig {
    pub fn dmg() -> Self {
        Self::default()
    }

    pub fn cgb() -> Self {
        Self {
            model: Model::Cgb,
            ..Self::default()
        }
    }

    pub fn with_trace(mut self, trace: TraceConfig) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_revision(mut self, revision: DmgRevision) -> Self {
        self.dmg_revision = revision;
        self
    }
}
