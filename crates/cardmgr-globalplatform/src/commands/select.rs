//! SELECT: choose the Issuer Security Domain (or any other AID) as the
//! currently addressed application.

use bytes::Bytes;
use cardmgr_apdu_core::{ApduCommand, ApduResponse, Error as CoreError, Executor, Response, StatusWord};
use tracing::debug;

use crate::constants::{cla, ins, select_p1, DEFAULT_ISD_AID};
use crate::error::{Error, Result};

/// `SELECT` (CLA=0x00, INS=0xA4, P1=0x04) by AID.
#[derive(Debug, Clone)]
pub struct Select {
    aid: Bytes,
}

impl Select {
    /// Select `aid` by DF name.
    pub fn by_aid(aid: impl Into<Bytes>) -> Self {
        Self { aid: aid.into() }
    }
}

impl ApduCommand for Select {
    type Success = SelectResponse;

    fn class(&self) -> u8 {
        cla::ISO7816
    }

    fn instruction(&self) -> u8 {
        ins::SELECT
    }

    fn p1(&self) -> u8 {
        select_p1::BY_NAME
    }

    fn p2(&self) -> u8 {
        0x00
    }

    fn data(&self) -> Option<&[u8]> {
        Some(&self.aid)
    }

    fn expected_length(&self) -> Option<u8> {
        Some(0x00)
    }

    fn parse_response(&self, raw: Bytes) -> core::result::Result<Self::Success, CoreError> {
        let response = Response::from_bytes(&raw)?;
        let fci = if response.is_success() && !response.payload().is_empty() {
            Some(response.payload().clone())
        } else {
            None
        };
        Ok(SelectResponse {
            status: response.status(),
            fci,
        })
    }
}

/// Response to [`Select`].
#[derive(Debug, Clone)]
pub struct SelectResponse {
    status: StatusWord,
    fci: Option<Bytes>,
}

impl SelectResponse {
    /// `true` for a `9000` status word.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Status word returned by the card.
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// File Control Information, if the card returned one.
    pub fn fci(&self) -> Option<&[u8]> {
        self.fci.as_deref()
    }
}

impl ApduResponse for SelectResponse {
    fn from_bytes(data: &[u8]) -> core::result::Result<Self, CoreError> {
        let response = Response::from_bytes(data)?;
        let fci = if response.is_success() && !response.payload().is_empty() {
            Some(response.payload().clone())
        } else {
            None
        };
        Ok(Self {
            status: response.status(),
            fci,
        })
    }
}

/// Select the Issuer Security Domain (spec.md §4.5's
/// `select_card_manager`), defaulting to [`DEFAULT_ISD_AID`] unless
/// `isd_aid` overrides it.
pub fn select_card_manager<E: Executor>(
    executor: &mut E,
    isd_aid: Option<&[u8]>,
) -> Result<SelectResponse> {
    let aid = isd_aid.unwrap_or(DEFAULT_ISD_AID);
    debug!(aid = %hex::encode(aid), "selecting card manager");
    let response = executor
        .execute(&Select::by_aid(aid.to_vec()))
        .map_err(Error::Apdu)?;
    if !response.is_success() {
        return Err(Error::UnexpectedStatus(response.status()));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn encodes_select_by_aid() {
        let aid = hex!("A000000151000000");
        let cmd = Select::by_aid(aid.to_vec());
        let raw = cmd.to_command().to_bytes();
        assert_eq!(raw.as_ref(), hex!("00A4040008A00000015100000000"));
    }

    #[test]
    fn parses_success_with_fci() {
        let mut data = hex!("6F108407A0000001510000A5050101020304").to_vec();
        data.extend_from_slice(&[0x90, 0x00]);
        let response = SelectResponse::from_bytes(&data).unwrap();
        assert!(response.is_success());
        assert!(response.fci().is_some());
    }

    #[test]
    fn parses_not_found() {
        let response = SelectResponse::from_bytes(&hex!("6A82")).unwrap();
        assert!(!response.is_success());
        assert_eq!(response.status(), StatusWord::new(0x6A, 0x82));
    }
}
