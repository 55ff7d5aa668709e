#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
/// DMG hardware revision.
///
/// Used to model revision-specific quirks that affect timing and observable
/// behavior.
pub enum DmgRevision {
    Rev0,
    RevA,
    RevB,
    #[default]
    RevC,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
/// Console model driven by the core.
pub enum Model {
    #[default]
    Dmg,
    Cgb,
}

impl Model {
    #[inline]
    pub const fn is_cgb(self) -> bool {
        matches!(self, Model::Cgb)
    }
}

/// Post-boot register contents as documented in
/// gbdev.io/pandocs/Power_Up_State.html, ordered A, F, B, C, D, E, H, L.
pub(crate) const fn boot_registers(model: Model, revision: DmgRevision) -> [u8; 8] {
    match (model, revision) {
        (Model::Cgb, _) => [0x11, 0x80, 0x00, 0x00, 0x00, 0x08, 0x00, 0x7C],
        (Model::Dmg, DmgRevision::Rev0) => [0x01, 0x00, 0xFF, 0x13, 0x00, 0xC1, 0x84, 0x03],
        (Model::Dmg, DmgRevision::RevA | DmgRevision::RevB | DmgRevision::RevC) => {
            [0x01, 0xB0, 0x00, 0x13, 0x00, 0xD8, 0x01, 0x4D]
        }
    }
}

/// Power-on DIV phase. These values match the phases measured by mooneye's
/// boot_div acceptance tests so the first post-boot instruction sequence
/// observes the expected timing.
pub(crate) const fn boot_divider(revision: DmgRevision) -> u16 {
    match revision {
        DmgRevision::Rev0 => 0x1830,
        DmgRevision::RevA | DmgRevision::RevB | DmgRevision::RevC => 0xABCC,
    }
}
