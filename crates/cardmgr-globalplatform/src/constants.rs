//! Wire-level constants defined by the GlobalPlatform Card Specification.

use cardmgr_apdu_core::StatusWord;

/// Command classes (CLA byte).
pub mod cla {
    /// Plain ISO 7816 class, used for SELECT.
    pub const ISO7816: u8 = 0x00;
    /// GlobalPlatform class, no secure messaging.
    pub const GP: u8 = 0x80;
    /// GlobalPlatform class with the secure-messaging (C-MAC) bit set.
    pub const GP_MAC: u8 = 0x84;
}

/// Instruction codes (INS byte).
pub mod ins {
    /// SELECT
    pub const SELECT: u8 = 0xA4;
    /// INITIALIZE UPDATE
    pub const INITIALIZE_UPDATE: u8 = 0x50;
    /// EXTERNAL AUTHENTICATE
    pub const EXTERNAL_AUTHENTICATE: u8 = 0x82;
    /// GET STATUS
    pub const GET_STATUS: u8 = 0xF2;
    /// SET STATUS
    pub const SET_STATUS: u8 = 0xF0;
    /// INSTALL
    pub const INSTALL: u8 = 0xE6;
    /// GET DATA
    pub const GET_DATA: u8 = 0xCA;
}

/// Parameter values for SELECT (P1).
pub mod select_p1 {
    /// Select by DF name (AID).
    pub const BY_NAME: u8 = 0x04;
}

/// Parameter values for GET STATUS (P1): scope of the query.
pub mod get_status_p1 {
    /// Issuer Security Domain only.
    pub const ISSUER_SECURITY_DOMAIN: u8 = 0x80;
    /// Applications and Supplementary Security Domains.
    pub const APPLICATIONS: u8 = 0x40;
    /// Executable Load Files.
    pub const EXEC_LOAD_FILES: u8 = 0x20;
}

/// Parameter values for GET STATUS (P2).
pub mod get_status_p2 {
    /// First or only page of a GET STATUS response.
    pub const FIRST_OR_ONLY: u8 = 0x00;
    /// Continuation page, requested after SW 6310.
    pub const NEXT: u8 = 0x01;
}

/// Parameter values for INSTALL (P1).
pub mod install_p1 {
    /// INSTALL [for install]
    pub const FOR_INSTALL: u8 = 0x04;
    /// INSTALL [for make selectable]
    pub const FOR_MAKE_SELECTABLE: u8 = 0x08;
    /// INSTALL [for install and make selectable]
    pub const FOR_INSTALL_AND_MAKE_SELECTABLE: u8 = FOR_INSTALL | FOR_MAKE_SELECTABLE;
}

/// Parameter values for SET STATUS (P1): scope of the target object.
pub mod set_status_p1 {
    /// Target is the Card Manager / Issuer Security Domain (card-level lock).
    pub const CARD: u8 = 0x80;
    /// Target is an Application or Security Domain.
    pub const APPLICATION: u8 = 0x40;
    /// Target association is being changed (extradition).
    pub const EXTRADITION: u8 = 0x60;
}

/// Life cycle bytes used as the SET STATUS data field for CLFDB operations.
pub mod life_cycle {
    /// LOCK an application or security domain.
    pub const LOCKED: u8 = 0x87;
    /// UNLOCK (restore to SELECTABLE).
    pub const SELECTABLE: u8 = 0x07;
    /// TERMINATE, irreversibly.
    pub const TERMINATED: u8 = 0xFF;
}

/// Status words the GlobalPlatform layer treats specially.
pub mod status {
    use super::StatusWord;

    /// Success.
    pub const SUCCESS: StatusWord = StatusWord::new(0x90, 0x00);
    /// GET STATUS has more entries; re-issue with P2 = NEXT.
    pub const MORE_DATA: StatusWord = StatusWord::new(0x63, 0x10);
    /// File or application not found.
    pub const FILE_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x82);
    /// Referenced data not found.
    pub const REFERENCED_DATA_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x88);
    /// Security condition not satisfied.
    pub const SECURITY_CONDITION_NOT_SATISFIED: StatusWord = StatusWord::new(0x69, 0x82);
    /// Conditions of use not satisfied.
    pub const CONDITIONS_NOT_SATISFIED: StatusWord = StatusWord::new(0x69, 0x85);
    /// Incorrect parameters P1-P2.
    pub const INCORRECT_P1P2: StatusWord = StatusWord::new(0x6A, 0x86);
}

/// Default Issuer Security Domain AID, used unless a configuration overrides it.
pub const DEFAULT_ISD_AID: &[u8] = &[0xA0, 0x00, 0x00, 0x01, 0x51, 0x00, 0x00, 0x00];

/// Length of the host and card challenges exchanged during the handshake.
pub const CHALLENGE_LENGTH: usize = 8;
