//! Secure channel protocol tag carried by a stored keyset.

use std::fmt;

use crate::error::Error;

/// Which Secure Channel Protocol a keyset's keys are diversified for
/// (spec.md §3: "a `protocol` tag ∈ {SCP02, SCP03}").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// SCP02: 3DES keys, 16 or 24 bytes.
    Scp02,
    /// SCP03: AES-128 keys, 16 bytes.
    Scp03,
}

impl Protocol {
    /// Canonical string form stored in the database.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scp02 => "SCP02",
            Self::Scp03 => "SCP03",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SCP02" => Ok(Self::Scp02),
            "SCP03" => Ok(Self::Scp03),
            other => Err(Error::InvalidProtocol(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        for protocol in [Protocol::Scp02, Protocol::Scp03] {
            let parsed: Protocol = protocol.as_str().parse().unwrap();
            assert_eq!(parsed, protocol);
        }
    }

    #[test]
    fn rejects_unknown_protocol() {
        assert!("SCP01".parse::<Protocol>().is_err());
    }
}
