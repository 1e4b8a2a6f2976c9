//! Status entries as classified by GET STATUS: security domains and
//! applications, their privileges and life-cycle state.

use bytes::Bytes;

use crate::error::{Error, Result};

/// Life-cycle byte the card reports for an object, named per the scope it
/// applies to even though several names share the same byte value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeCycleState {
    /// Card is OP_READY (0x01).
    OpReady,
    /// Card is INITIALIZED / application is INSTALLED (0x03).
    Initialized,
    /// Application or Security Domain is SELECTABLE (0x07).
    Selectable,
    /// Card is SECURED / application is PERSONALIZED (0x0F).
    Secured,
    /// Card is CARD_LOCKED (0x7F).
    CardLocked,
    /// Application or Security Domain is BLOCKED/LOCKED (0x83/0x87).
    Locked,
    /// Object is TERMINATED, irreversibly (0xFF).
    Terminated,
    /// A byte not covered by the named states above.
    Other(u8),
}

impl LifeCycleState {
    /// Classify a raw life-cycle byte as reported by GET STATUS.
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => Self::OpReady,
            0x03 => Self::Initialized,
            0x07 => Self::Selectable,
            0x0F => Self::Secured,
            0x7F => Self::CardLocked,
            0x83 | 0x87 => Self::Locked,
            0xFF => Self::Terminated,
            other => Self::Other(other),
        }
    }

    /// The raw byte this state was constructed from (or the canonical value
    /// for named states).
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::OpReady => 0x01,
            Self::Initialized => 0x03,
            Self::Selectable => 0x07,
            Self::Secured => 0x0F,
            Self::CardLocked => 0x7F,
            Self::Locked => 0x87,
            Self::Terminated => 0xFF,
            Self::Other(b) => b,
        }
    }
}

/// Privileges bitfield (GlobalPlatform Card Specification table 6-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Privileges(pub u8);

impl Privileges {
    /// The object is a Security Domain.
    pub const SECURITY_DOMAIN: u8 = 0x80;
    /// DAP Verification.
    pub const DAP_VERIFICATION: u8 = 0x40;
    /// Delegated Management.
    pub const DELEGATED_MANAGEMENT: u8 = 0x20;
    /// Card Lock.
    pub const CARD_LOCK: u8 = 0x10;
    /// Card Terminate.
    pub const CARD_TERMINATE: u8 = 0x08;
    /// Card Reset.
    pub const CARD_RESET: u8 = 0x04;
    /// CVM Management.
    pub const CVM_MANAGEMENT: u8 = 0x02;
    /// Mandated DAP.
    pub const MANDATED_DAP: u8 = 0x01;

    /// `true` if every bit in `mask` is set.
    pub const fn has(self, mask: u8) -> bool {
        self.0 & mask == mask
    }

    /// `true` if the Security-Domain bit (0x80) is set.
    pub const fn is_security_domain(self) -> bool {
        self.has(Self::SECURITY_DOMAIN)
    }
}

/// What kind of Security Domain an entry describes, per spec.md §3's
/// classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityDomainKind {
    /// Issuer Security Domain: the card manager itself.
    Isd,
    /// Supplementary Security Domain.
    Ssd,
    /// Application-associated Security Domain with Delegated Management.
    Dmsd,
}

/// A GET STATUS entry classified as a Security Domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityDomainDescriptor {
    /// AID (5-16 bytes).
    pub aid: Bytes,
    /// Raw life-cycle byte, as reported.
    pub life_cycle: LifeCycleState,
    /// Raw privileges byte.
    pub privileges: Privileges,
    /// ISD / SSD / DMSD, derived from `privileges` and the ISD AID.
    pub kind: SecurityDomainKind,
}

/// A GET STATUS entry classified as an ordinary application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDescriptor {
    /// AID (5-16 bytes).
    pub aid: Bytes,
    /// Raw life-cycle byte, as reported.
    pub life_cycle: LifeCycleState,
    /// Raw privileges byte.
    pub privileges: Privileges,
}

/// One parsed GET STATUS entry, classified into a domain or an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEntry {
    /// Security Domain (ISD, SSD or DMSD).
    SecurityDomain(SecurityDomainDescriptor),
    /// Ordinary application.
    Application(ApplicationDescriptor),
}

impl StatusEntry {
    /// AID common to both variants.
    pub fn aid(&self) -> &Bytes {
        match self {
            Self::SecurityDomain(d) => &d.aid,
            Self::Application(a) => &a.aid,
        }
    }

    /// Classify and build one entry from its AID, life-cycle and privileges
    /// bytes, per spec.md §4.5:
    ///
    /// - Privileges bit `0x80` set → Security Domain: the ISD AID matches →
    ///   [`SecurityDomainKind::Isd`]; else bit `0x20` set → Dmsd; else Ssd.
    /// - Otherwise → application.
    pub fn classify(aid: Bytes, life_cycle: u8, privileges: u8, isd_aid: &[u8]) -> Self {
        let privileges = Privileges(privileges);
        let life_cycle = LifeCycleState::from_byte(life_cycle);
        if privileges.is_security_domain() {
            let kind = if aid.as_ref() == isd_aid {
                SecurityDomainKind::Isd
            } else if privileges.has(Privileges::DELEGATED_MANAGEMENT) {
                SecurityDomainKind::Dmsd
            } else {
                SecurityDomainKind::Ssd
            };
            Self::SecurityDomain(SecurityDomainDescriptor {
                aid,
                life_cycle,
                privileges,
                kind,
            })
        } else {
            Self::Application(ApplicationDescriptor {
                aid,
                life_cycle,
                privileges,
            })
        }
    }
}

/// Parse the flat `AID_len | AID | LC | Privileges` entries a GET STATUS
/// response page carries (spec.md §4.5), classifying each one.
///
/// This is GlobalPlatform's "plain" GET STATUS format (P2 bit `0x02` clear),
/// not the BER-TLV-tagged format (`E3`/`E2` wrapped entries) some
/// implementations request instead.
pub fn parse_status_entries(data: &[u8], isd_aid: &[u8]) -> Result<Vec<StatusEntry>> {
    let mut entries = Vec::new();
    let mut index = 0;
    while index < data.len() {
        let aid_len = data[index] as usize;
        index += 1;
        if aid_len < 5 || aid_len > 16 {
            return Err(Error::InvalidAidLength(aid_len));
        }
        if index + aid_len + 2 > data.len() {
            return Err(Error::TruncatedEntry);
        }
        let aid = Bytes::copy_from_slice(&data[index..index + aid_len]);
        index += aid_len;
        let life_cycle = data[index];
        let privileges = data[index + 1];
        index += 2;
        entries.push(StatusEntry::classify(aid, life_cycle, privileges, isd_aid));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const ISD_AID: &[u8] = &hex!("A000000151000000");

    #[test]
    fn classifies_isd() {
        let aid = Bytes::copy_from_slice(ISD_AID);
        let entry = StatusEntry::classify(aid.clone(), 0x0F, 0x80, ISD_AID);
        match entry {
            StatusEntry::SecurityDomain(d) => assert_eq!(d.kind, SecurityDomainKind::Isd),
            _ => panic!("expected a security domain"),
        }
    }

    #[test]
    fn classifies_dmsd() {
        let aid = Bytes::from_static(&hex!("A000000003000000"));
        let entry = StatusEntry::classify(aid, 0x0F, 0xA0, ISD_AID);
        match entry {
            StatusEntry::SecurityDomain(d) => assert_eq!(d.kind, SecurityDomainKind::Dmsd),
            _ => panic!("expected a security domain"),
        }
    }

    #[test]
    fn classifies_ssd() {
        let aid = Bytes::from_static(&hex!("A000000003000000"));
        let entry = StatusEntry::classify(aid, 0x0F, 0x80, ISD_AID);
        match entry {
            StatusEntry::SecurityDomain(d) => assert_eq!(d.kind, SecurityDomainKind::Ssd),
            _ => panic!("expected a security domain"),
        }
    }

    #[test]
    fn classifies_application() {
        let aid = Bytes::from_static(&hex!("A0000000030000"));
        let entry = StatusEntry::classify(aid, 0x07, 0x00, ISD_AID);
        assert!(matches!(entry, StatusEntry::Application(_)));
    }

    #[test]
    fn parses_scenario_s3_entry() {
        // AID len 0x08, 8-byte ISD AID, LC 0x0F, privileges 0x80 (a security domain).
        let data = hex!("08A0000001510000000F80");
        let entries = parse_status_entries(&data, ISD_AID).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].aid().as_ref(), ISD_AID);
        match &entries[0] {
            StatusEntry::SecurityDomain(d) => assert_eq!(d.kind, SecurityDomainKind::Isd),
            _ => panic!("expected a security domain"),
        }
    }
}
