//! GET STATUS, with GlobalPlatform's paging convention (SW `6310` means
//! "more data available": re-issue with P2 = `NEXT` and concatenate).

use bytes::{Bytes, BytesMut};
use cardmgr_apdu_core::{ApduCommand, ApduResponse, Error as CoreError, Executor, Response, StatusWord};

use tracing::{debug, trace};

use crate::constants::{cla, get_status_p1, get_status_p2, ins, status};
use crate::descriptor::{parse_status_entries, StatusEntry};
use crate::error::{Error, Result};

/// Scope of objects a [`GetStatus`] query asks the card to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusScope {
    /// Issuer Security Domain only.
    IssuerSecurityDomain,
    /// Applications and Supplementary Security Domains.
    Applications,
    /// Executable Load Files.
    ExecutableLoadFiles,
}

impl StatusScope {
    const fn p1(self) -> u8 {
        match self {
            Self::IssuerSecurityDomain => get_status_p1::ISSUER_SECURITY_DOMAIN,
            Self::Applications => get_status_p1::APPLICATIONS,
            Self::ExecutableLoadFiles => get_status_p1::EXEC_LOAD_FILES,
        }
    }
}

/// `GET STATUS` (CLA=0x80, INS=0xF2) for one page of one scope.
#[derive(Debug, Clone)]
pub struct GetStatus {
    scope: StatusScope,
    next_page: bool,
}

impl GetStatus {
    /// Build the first-page query for `scope`.
    pub const fn new(scope: StatusScope) -> Self {
        Self {
            scope,
            next_page: false,
        }
    }

    /// Build the continuation query for `scope`, issued after SW `6310`.
    pub const fn next(scope: StatusScope) -> Self {
        Self {
            scope,
            next_page: true,
        }
    }
}

impl ApduCommand for GetStatus {
    type Success = GetStatusResponse;

    fn class(&self) -> u8 {
        cla::GP
    }

    fn instruction(&self) -> u8 {
        ins::GET_STATUS
    }

    fn p1(&self) -> u8 {
        self.scope.p1()
    }

    fn p2(&self) -> u8 {
        if self.next_page {
            get_status_p2::NEXT
        } else {
            get_status_p2::FIRST_OR_ONLY
        }
    }

    fn data(&self) -> Option<&[u8]> {
        // An empty, but present, data field: GET STATUS always carries a
        // (possibly zero-length) search qualifier TLV. An empty one matches
        // "any".
        Some(&[])
    }

    fn expected_length(&self) -> Option<u8> {
        Some(0x00)
    }

    fn parse_response(&self, raw: Bytes) -> core::result::Result<Self::Success, CoreError> {
        let response = Response::from_bytes(&raw)?;
        Ok(GetStatusResponse {
            status: response.status(),
            payload: response.payload().clone(),
        })
    }
}

/// Response to one [`GetStatus`] page.
#[derive(Debug, Clone)]
pub struct GetStatusResponse {
    status: StatusWord,
    payload: Bytes,
}

impl GetStatusResponse {
    /// Status word returned by the card.
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// `true` when the card signals more pages follow (`SW = 6310`).
    pub fn has_more_pages(&self) -> bool {
        self.status == status::MORE_DATA
    }

    /// Raw entry bytes carried on this page.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl ApduResponse for GetStatusResponse {
    fn from_bytes(data: &[u8]) -> core::result::Result<Self, CoreError> {
        let response = Response::from_bytes(data)?;
        Ok(Self {
            status: response.status(),
            payload: response.payload().clone(),
        })
    }
}

/// Fetch every entry in `scope`, transparently paging through `6310`
/// continuations, and classify the results against `isd_aid`.
pub fn get_status<E: Executor>(
    executor: &mut E,
    scope: StatusScope,
    isd_aid: &[u8],
) -> Result<Vec<StatusEntry>> {
    let mut combined = BytesMut::new();
    let mut pages = 1;
    let mut response = executor
        .execute(&GetStatus::new(scope))
        .map_err(Error::Apdu)?;
    combined.extend_from_slice(response.payload());

    while response.has_more_pages() {
        trace!(?scope, pages, "get_status: more data, fetching next page");
        response = executor
            .execute(&GetStatus::next(scope))
            .map_err(Error::Apdu)?;
        combined.extend_from_slice(response.payload());
        pages += 1;
    }

    if !response.status().is_success() {
        return Err(Error::UnexpectedStatus(response.status()));
    }

    let entries = parse_status_entries(&combined, isd_aid)?;
    debug!(?scope, pages, entries = entries.len(), "get_status complete");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn encodes_first_page() {
        let cmd = GetStatus::new(StatusScope::IssuerSecurityDomain);
        let raw = cmd.to_command().to_bytes();
        assert_eq!(raw.as_ref(), hex!("80F280000000"));
    }

    #[test]
    fn encodes_next_page() {
        let cmd = GetStatus::next(StatusScope::Applications);
        let raw = cmd.to_command().to_bytes();
        assert_eq!(raw.as_ref(), hex!("80F240010000"));
    }

    #[test]
    fn detects_more_data() {
        let mut data = hex!("08A0000001510000000F80").to_vec();
        data.extend_from_slice(&[0x63, 0x10]);
        let response = GetStatusResponse::from_bytes(&data).unwrap();
        assert!(response.has_more_pages());
    }

    #[test]
    fn scope_p1_mapping() {
        assert_eq!(
            StatusScope::IssuerSecurityDomain.p1(),
            get_status_p1::ISSUER_SECURITY_DOMAIN
        );
        assert_eq!(StatusScope::Applications.p1(), get_status_p1::APPLICATIONS);
        assert_eq!(
            StatusScope::ExecutableLoadFiles.p1(),
            get_status_p1::EXEC_LOAD_FILES
        );
    }
}
