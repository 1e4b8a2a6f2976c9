//! INSTALL [for install and make selectable], used here only to create a
//! new Security Domain (spec.md §4.5's `create_security_domain`). Loading
//! and personalizing executable modules is out of scope.

use bytes::{Bytes, BytesMut};
use cardmgr_apdu_core::{ApduCommand, ApduResponse, Error as CoreError, Executor, Response, StatusWord};
use tracing::debug;

use crate::constants::{cla, ins, install_p1};
use crate::error::{Error, Result};

/// `INSTALL [for install and make selectable]` (CLA=0x80, INS=0xE6, P1=0x0C),
/// specialized to bare Security Domain creation: the Executable Load File
/// and Executable Module AIDs are empty, as is the install token.
#[derive(Debug, Clone)]
pub struct CreateSecurityDomain {
    aid: Bytes,
    privileges: u8,
    install_parameters: Bytes,
}

impl CreateSecurityDomain {
    /// Build the command for a new Security Domain `aid` with the given
    /// privileges byte (spec.md §3's `Privileges` bitfield; the
    /// Security-Domain bit `0x80` is implied by the caller).
    pub fn new(aid: impl Into<Bytes>, privileges: u8) -> Self {
        Self {
            aid: aid.into(),
            privileges,
            install_parameters: Bytes::new(),
        }
    }

    /// Attach application-specific install parameters (tag `C9`).
    pub fn with_install_parameters(mut self, params: impl Into<Bytes>) -> Self {
        self.install_parameters = params.into();
        self
    }

    fn build_data(&self) -> Bytes {
        let mut data = BytesMut::new();
        // Executable Load File AID: empty.
        data.extend_from_slice(&[0x00]);
        // Executable Module AID: empty.
        data.extend_from_slice(&[0x00]);
        // Application (Security Domain) AID.
        data.extend_from_slice(&[self.aid.len() as u8]);
        data.extend_from_slice(&self.aid);
        // Privileges.
        data.extend_from_slice(&[0x01, self.privileges]);
        // Install parameters, wrapped in tag C9 even when empty.
        let mut params_tlv = BytesMut::new();
        params_tlv.extend_from_slice(&[0xC9, self.install_parameters.len() as u8]);
        params_tlv.extend_from_slice(&self.install_parameters);
        data.extend_from_slice(&[params_tlv.len() as u8]);
        data.extend_from_slice(&params_tlv);
        // Install token: empty.
        data.extend_from_slice(&[0x00]);
        data.freeze()
    }
}

impl ApduCommand for CreateSecurityDomain {
    type Success = InstallResponse;

    fn class(&self) -> u8 {
        cla::GP
    }

    fn instruction(&self) -> u8 {
        ins::INSTALL
    }

    fn p1(&self) -> u8 {
        install_p1::FOR_INSTALL_AND_MAKE_SELECTABLE
    }

    fn p2(&self) -> u8 {
        0x00
    }

    fn data(&self) -> Option<&[u8]> {
        None
    }

    fn to_command(&self) -> cardmgr_apdu_core::Command {
        cardmgr_apdu_core::Command::new_with_data(
            self.class(),
            self.instruction(),
            self.p1(),
            self.p2(),
            self.build_data(),
        )
    }

    fn parse_response(&self, raw: Bytes) -> core::result::Result<Self::Success, CoreError> {
        InstallResponse::from_bytes(&raw)
    }
}

/// Response to [`CreateSecurityDomain`].
#[derive(Debug, Clone, Copy)]
pub struct InstallResponse {
    status: StatusWord,
}

impl InstallResponse {
    /// `true` for a `9000` status word.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Status word returned by the card.
    pub const fn status(&self) -> StatusWord {
        self.status
    }
}

impl ApduResponse for InstallResponse {
    fn from_bytes(data: &[u8]) -> core::result::Result<Self, CoreError> {
        let response = Response::from_bytes(data)?;
        Ok(Self {
            status: response.status(),
        })
    }
}

/// Create a bare Security Domain at `aid` with `privileges` (spec.md §4.5's
/// `create_security_domain`), raising on any non-`9000` status.
pub fn create_security_domain<E: Executor>(
    executor: &mut E,
    aid: impl Into<Bytes>,
    privileges: u8,
) -> Result<()> {
    let aid = aid.into();
    debug!(aid = %hex::encode(&aid), privileges, "creating security domain");
    let response = executor
        .execute(&CreateSecurityDomain::new(aid, privileges))
        .map_err(Error::Apdu)?;
    if !response.is_success() {
        return Err(Error::UnexpectedStatus(response.status()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn encodes_bare_security_domain() {
        let aid = hex!("A000000003000001");
        let cmd = CreateSecurityDomain::new(aid.to_vec(), 0x80);
        let data = cmd.build_data();
        assert_eq!(
            data.as_ref(),
            hex!("000008A000000003000001018002C90000").as_ref()
        );
    }

    #[test]
    fn parses_success() {
        let response = InstallResponse::from_bytes(&hex!("9000")).unwrap();
        assert!(response.is_success());
    }
}
