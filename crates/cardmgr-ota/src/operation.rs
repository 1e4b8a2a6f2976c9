//! CLFDB operations the OTA builder can target, and their life-cycle byte
//! mapping (spec.md §8 property P5: total and injective).

/// A life-cycle operation an OTA CLFDB command drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaClfdbOperation {
    /// Transition to LOCKED (`0x87`).
    Lock,
    /// Transition back to SELECTABLE (`0x07`).
    Unlock,
    /// Transition to TERMINATED (`0xFF`), irreversible.
    Terminate,
    /// Transition a freshly installed application/SD to SELECTABLE
    /// (`0x07`, same byte as [`Self::Unlock`] — distinct operation tag for
    /// message history, same lifecycle transition).
    MakeSelectable,
}

impl OtaClfdbOperation {
    /// The life-cycle byte this operation substitutes for `{lifecycle}`.
    pub const fn life_cycle_byte(self) -> u8 {
        match self {
            Self::Lock => 0x87,
            Self::Unlock | Self::MakeSelectable => 0x07,
            Self::Terminate => 0xFF,
        }
    }

    /// The operation tag recorded on the generated [`cardmgr_store::OtaMessage`].
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lock => "LOCK",
            Self::Unlock => "UNLOCK",
            Self::Terminate => "TERMINATE",
            Self::MakeSelectable => "MAKE_SELECTABLE",
        }
    }
}

impl std::fmt::Display for OtaClfdbOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn life_cycle_mapping_matches_property_p5() {
        assert_eq!(OtaClfdbOperation::Lock.life_cycle_byte(), 0x87);
        assert_eq!(OtaClfdbOperation::Unlock.life_cycle_byte(), 0x07);
        assert_eq!(OtaClfdbOperation::Terminate.life_cycle_byte(), 0xFF);
        assert_eq!(OtaClfdbOperation::MakeSelectable.life_cycle_byte(), 0x07);
    }
}
