//! APDU command representation and the [`ApduCommand`] trait.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::Error;
use crate::response::ApduResponse;

/// Expected response length (`Le`). A plain `u8` covers the short form used
/// throughout GlobalPlatform and ETSI OTA command sets; extended-length
/// cards are out of scope (see spec.md Non-goals).
pub type ExpectedLength = u8;

/// A raw, untyped APDU command: `CLA INS P1 P2 [Lc Data] [Le]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Option<Bytes>,
    le: Option<ExpectedLength>,
}

impl Command {
    /// Build a bare command header with no data and no `Le`.
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Build a command with a requested response length and no data (case 2).
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: ExpectedLength) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: Some(le),
        }
    }

    /// Build a command carrying data and no `Le` (case 3).
    pub fn new_with_data(cla: u8, ins: u8, p1: u8, p2: u8, data: impl Into<Bytes>) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Some(data.into()),
            le: None,
        }
    }

    /// Build a command carrying data and a requested response length (case 4).
    pub fn new_with_data_and_le(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: impl Into<Bytes>,
        le: ExpectedLength,
    ) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Some(data.into()),
            le: Some(le),
        }
    }

    /// Attach a data field, replacing any previous one.
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Attach an expected response length, replacing any previous one.
    pub const fn with_le(mut self, le: ExpectedLength) -> Self {
        self.le = Some(le);
        self
    }

    /// Class byte.
    pub const fn class(&self) -> u8 {
        self.cla
    }

    /// Instruction byte.
    pub const fn instruction(&self) -> u8 {
        self.ins
    }

    /// Parameter byte 1.
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Parameter byte 2.
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Command data field, if any.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Requested response length, if any.
    pub const fn expected_length(&self) -> Option<ExpectedLength> {
        self.le
    }

    /// Total length of the serialized command.
    pub fn command_length(&self) -> usize {
        self.to_bytes().len()
    }

    /// Serialize to wire bytes (ISO 7816-4 short form, case 1/2/3/4).
    pub fn to_bytes(&self) -> Bytes {
        let data_len = self.data.as_ref().map_or(0, |d| d.len());
        let mut buf = BytesMut::with_capacity(4 + 1 + data_len + 1);
        buf.put_u8(self.cla);
        buf.put_u8(self.ins);
        buf.put_u8(self.p1);
        buf.put_u8(self.p2);

        if let Some(data) = &self.data {
            buf.put_u8(data.len() as u8);
            buf.put_slice(data);
        }

        if let Some(le) = self.le {
            buf.put_u8(le);
        }

        buf.freeze()
    }

    /// Parse a command from raw wire bytes, covering all four ISO 7816-4
    /// short-form cases.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < 4 {
            return Err(Error::Parse("command shorter than header"));
        }

        let cla = data[0];
        let ins = data[1];
        let p1 = data[2];
        let p2 = data[3];

        match data.len() {
            4 => Ok(Self::new(cla, ins, p1, p2)),
            5 => Ok(Self::new_with_le(cla, ins, p1, p2, data[4])),
            len => {
                let lc = data[4] as usize;
                if len == 5 + lc {
                    // case 3: header + Lc + data, no Le
                    Ok(Self::new_with_data(cla, ins, p1, p2, data[5..].to_vec()))
                } else if len == 5 + lc + 1 {
                    // case 4: header + Lc + data + Le
                    let body = &data[5..5 + lc];
                    let le = data[5 + lc];
                    Ok(Self::new_with_data_and_le(
                        cla,
                        ins,
                        p1,
                        p2,
                        body.to_vec(),
                        le,
                    ))
                } else {
                    Err(Error::Parse("inconsistent Lc/data/Le framing"))
                }
            }
        }
    }
}

/// Trait implemented by strongly typed GlobalPlatform/OTA commands so they
/// can be executed through an [`crate::Executor`] and parsed back into a
/// typed response.
pub trait ApduCommand: Sized {
    /// Successful response type.
    type Success: ApduResponse;

    /// Class byte.
    fn class(&self) -> u8;
    /// Instruction byte.
    fn instruction(&self) -> u8;
    /// Parameter byte 1.
    fn p1(&self) -> u8;
    /// Parameter byte 2.
    fn p2(&self) -> u8;
    /// Command data field.
    fn data(&self) -> Option<&[u8]>;
    /// Expected response length, if any.
    fn expected_length(&self) -> Option<ExpectedLength> {
        None
    }

    /// Build the untyped [`Command`] for transmission.
    fn to_command(&self) -> Command {
        let mut cmd = Command::new(self.class(), self.instruction(), self.p1(), self.p2());
        if let Some(data) = self.data() {
            cmd = cmd.with_data(data.to_vec());
        }
        if let Some(le) = self.expected_length() {
            cmd = cmd.with_le(le);
        }
        cmd
    }

    /// Parse a raw response into the typed success/error representation.
    fn parse_response(&self, raw: Bytes) -> Result<Self::Success, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn serializes_each_case() {
        assert_eq!(
            Command::new(0x00, 0xA4, 0x04, 0x00).to_bytes().as_ref(),
            &hex!("00A40400")
        );
        assert_eq!(
            Command::new_with_le(0x00, 0xA4, 0x04, 0x00, 0x10)
                .to_bytes()
                .as_ref(),
            &hex!("00A4040010")
        );
        assert_eq!(
            Command::new_with_data(0x00, 0xA4, 0x04, 0x00, hex!("A000").to_vec())
                .to_bytes()
                .as_ref(),
            &hex!("00A4040002A000")
        );
        assert_eq!(
            Command::new_with_data_and_le(0x00, 0xA4, 0x04, 0x00, hex!("A000").to_vec(), 0x00)
                .to_bytes()
                .as_ref(),
            &hex!("00A4040002A00000")
        );
    }

    #[test]
    fn round_trips_from_bytes() {
        for raw in [
            hex!("00A40400").to_vec(),
            hex!("00A4040010").to_vec(),
            hex!("00A4040002A000").to_vec(),
            hex!("00A4040002A00000").to_vec(),
        ] {
            let cmd = Command::from_bytes(&raw).unwrap();
            assert_eq!(cmd.to_bytes().as_ref(), raw.as_slice());
        }
    }

    #[test]
    fn rejects_short_header() {
        assert!(Command::from_bytes(&hex!("00A4")).is_err());
    }
}
