//! Secure channel security levels (GlobalPlatform Card Specification
//! Table 6-1: `EXTERNAL AUTHENTICATE` P1 bit meanings).

use cardmgr_apdu_core::processor::secure::SecurityLevel as CoreSecurityLevel;

/// Protection a secure channel applies to outgoing commands and, if
/// R-MAC is in effect, to incoming responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityLevel {
    /// C-MAC: every command is integrity-protected. GlobalPlatform requires
    /// this once a secure channel is open; `false` is only meaningful before
    /// `EXTERNAL AUTHENTICATE`.
    pub command_mac: bool,
    /// C-DECRYPTION: command data is encrypted before the MAC is computed.
    pub command_enc: bool,
    /// R-MAC: responses carry a trailing MAC the channel verifies.
    pub response_mac: bool,
}

impl SecurityLevel {
    /// L1: C-MAC only.
    pub const MAC: Self = Self {
        command_mac: true,
        command_enc: false,
        response_mac: false,
    };
    /// L2: C-MAC and C-DECRYPTION.
    pub const MAC_ENC: Self = Self {
        command_mac: true,
        command_enc: true,
        response_mac: false,
    };
    /// L3: L2 plus R-MAC.
    pub const FULL: Self = Self {
        command_mac: true,
        command_enc: true,
        response_mac: true,
    };

    /// Encode as the `EXTERNAL AUTHENTICATE` P1 byte.
    pub const fn to_p1(self) -> u8 {
        let mut p1 = 0u8;
        if self.command_mac {
            p1 |= 0x01;
        }
        if self.command_enc {
            p1 |= 0x02;
        }
        if self.response_mac {
            p1 |= 0x10;
        }
        p1
    }

    /// Project onto the coarser [`CoreSecurityLevel`] the processor pipeline
    /// and `cardmgr-globalplatform` command layer reason about.
    pub const fn to_core(self) -> CoreSecurityLevel {
        CoreSecurityLevel {
            integrity: self.command_mac,
            encryption: self.command_enc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_p1_bits() {
        assert_eq!(SecurityLevel::MAC.to_p1(), 0x01);
        assert_eq!(SecurityLevel::MAC_ENC.to_p1(), 0x03);
        assert_eq!(SecurityLevel::FULL.to_p1(), 0x13);
    }

    #[test]
    fn projects_onto_core_level() {
        let core = SecurityLevel::MAC_ENC.to_core();
        assert!(core.integrity);
        assert!(core.encryption);

        let core = SecurityLevel::default().to_core();
        assert!(!core.integrity);
        assert!(!core.encryption);
    }
}
