//! APDU response parsing (ISO/IEC 7816-4 status words).

use std::fmt;

use bytes::Bytes;

use crate::error::Error;

/// Status word (`SW1 SW2`) trailing every APDU response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    /// First status byte.
    pub sw1: u8,
    /// Second status byte.
    pub sw2: u8,
}

impl StatusWord {
    /// GlobalPlatform/ISO success status word `9000`.
    pub const SUCCESS: Self = Self::new(0x90, 0x00);

    /// Build a status word from its two bytes.
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Pack into a big-endian `u16` (`SW1 << 8 | SW2`).
    pub const fn to_u16(self) -> u16 {
        ((self.sw1 as u16) << 8) | self.sw2 as u16
    }

    /// `true` for `9000`.
    pub const fn is_success(self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// `true` for the `61xx` "more data available" family used by GET
    /// STATUS paging (spec.md §4.5 P6) and GET RESPONSE chaining.
    pub const fn has_more_data(self) -> bool {
        self.sw1 == 0x61
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// Trait for typed command responses parsed from raw bytes.
pub trait ApduResponse: Sized {
    /// Parse a response from the raw trailer-included bytes.
    fn from_bytes(data: &[u8]) -> Result<Self, Error>;
}

/// Untyped response: payload plus trailing status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Bytes,
    status: StatusWord,
}

impl Response {
    /// Split raw response bytes into payload and status word.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < 2 {
            return Err(Error::Parse("response shorter than status word"));
        }
        let (payload, sw) = data.split_at(data.len() - 2);
        Ok(Self {
            payload: Bytes::copy_from_slice(payload),
            status: StatusWord::new(sw[0], sw[1]),
        })
    }

    /// Response payload (empty if none).
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Trailing status word.
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// `true` if [`StatusWord::is_success`].
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl ApduResponse for Response {
    fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        Self::from_bytes(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_payload_and_status() {
        let resp = Response::from_bytes(&[0x01, 0x02, 0x90, 0x00]).unwrap();
        assert_eq!(resp.payload().as_ref(), &[0x01, 0x02]);
        assert!(resp.is_success());
    }

    #[test]
    fn empty_payload() {
        let resp = Response::from_bytes(&[0x6A, 0x82]).unwrap();
        assert!(resp.payload().is_empty());
        assert!(!resp.is_success());
        assert_eq!(resp.status().to_u16(), 0x6A82);
    }
}
