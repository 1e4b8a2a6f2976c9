//! GET DATA: read a single card data object by its two-byte tag.

use bytes::Bytes;
use cardmgr_apdu_core::{ApduCommand, ApduResponse, Error as CoreError, Executor, Response, StatusWord};
use tracing::trace;

use crate::constants::{cla, ins};
use crate::error::{Error, Result};

/// `GET DATA` (CLA=0x80, INS=0xCA, P1/P2 = tag high/low byte).
#[derive(Debug, Clone, Copy)]
pub struct GetData {
    tag: u16,
}

impl GetData {
    /// Build a query for the two-byte data object tag `tag`.
    pub const fn new(tag: u16) -> Self {
        Self { tag }
    }
}

impl ApduCommand for GetData {
    type Success = GetDataResponse;

    fn class(&self) -> u8 {
        cla::GP
    }

    fn instruction(&self) -> u8 {
        ins::GET_DATA
    }

    fn p1(&self) -> u8 {
        (self.tag >> 8) as u8
    }

    fn p2(&self) -> u8 {
        (self.tag & 0xFF) as u8
    }

    fn data(&self) -> Option<&[u8]> {
        None
    }

    fn expected_length(&self) -> Option<u8> {
        Some(0x00)
    }

    fn parse_response(&self, raw: Bytes) -> core::result::Result<Self::Success, CoreError> {
        GetDataResponse::from_bytes(&raw)
    }
}

/// Response to [`GetData`].
#[derive(Debug, Clone)]
pub struct GetDataResponse {
    status: StatusWord,
    value: Bytes,
}

impl GetDataResponse {
    /// `true` for a `9000` status word.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Status word returned by the card.
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Raw data object value (empty on error).
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

impl ApduResponse for GetDataResponse {
    fn from_bytes(data: &[u8]) -> core::result::Result<Self, CoreError> {
        let response = Response::from_bytes(data)?;
        Ok(Self {
            status: response.status(),
            value: response.payload().clone(),
        })
    }
}

/// Read data object `tag` (spec.md §4.5's `get_card_data`), raising on any
/// non-`9000` status.
pub fn get_card_data<E: Executor>(executor: &mut E, tag: u16) -> Result<Bytes> {
    trace!(tag = format!("{tag:04X}"), "get_card_data");
    let response = executor.execute(&GetData::new(tag)).map_err(Error::Apdu)?;
    if !response.is_success() {
        return Err(Error::UnexpectedStatus(response.status()));
    }
    Ok(Bytes::copy_from_slice(response.value()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn encodes_tag() {
        // Tag 0x00CF: Key Information Data.
        let cmd = GetData::new(0x00CF);
        let raw = cmd.to_command().to_bytes();
        assert_eq!(raw.as_ref(), hex!("80CA00CF00"));
    }

    #[test]
    fn parses_value() {
        let mut data = hex!("C00401020304").to_vec();
        data.extend_from_slice(&[0x90, 0x00]);
        let response = GetDataResponse::from_bytes(&data).unwrap();
        assert!(response.is_success());
        assert_eq!(response.value(), hex!("C00401020304").as_slice());
    }
}
