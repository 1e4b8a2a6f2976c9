//! `INITIALIZE UPDATE` / `EXTERNAL AUTHENTICATE` handshake mechanics shared
//! by the SCP02 and SCP03 engines.

use bytes::Bytes;
use cardmgr_apdu_core::{Command, Response};
use rand::RngCore;

use crate::constants::{
    scp_id, CLA_ISU, CHALLENGE_LENGTH, INS_INITIALIZE_UPDATE, SCP02_RESPONSE_LENGTH,
    SCP03_RESPONSE_LENGTH,
};
use crate::error::{Error, Result};

/// Generate an 8-byte host challenge from the system CSPRNG.
pub fn host_challenge() -> [u8; CHALLENGE_LENGTH] {
    let mut challenge = [0u8; CHALLENGE_LENGTH];
    rand::rng().fill_bytes(&mut challenge);
    challenge
}

/// Build the `INITIALIZE UPDATE` command (`80 50 KVN 00 08 host_challenge 00`).
pub fn build_initialize_update(kvn: u8, host_challenge: &[u8; CHALLENGE_LENGTH]) -> Command {
    Command::new_with_data_and_le(CLA_ISU, INS_INITIALIZE_UPDATE, kvn, 0x00, host_challenge.to_vec(), 0x00)
}

/// Parsed `INITIALIZE UPDATE` response, protocol-agnostic until [`parse`]
/// inspects the `SCP_ID` byte.
#[derive(Debug, Clone)]
pub enum ChallengeResponse {
    /// SCP02 variant.
    Scp02 {
        /// Card challenge.
        card_challenge: [u8; 8],
        /// Card authentication cryptogram.
        card_cryptogram: [u8; 8],
    },
    /// SCP03 variant.
    Scp03 {
        /// Card's 3-byte session sequence counter.
        sequence_counter: [u8; 3],
        /// Card challenge.
        card_challenge: [u8; 8],
        /// Card authentication cryptogram.
        card_cryptogram: [u8; 8],
    },
}

/// Parse an `INITIALIZE UPDATE` response payload (status word already
/// stripped), auto-detecting SCP02 vs SCP03 from the `SCP_ID` byte.
pub fn parse_challenge_response(payload: &[u8]) -> Result<ChallengeResponse> {
    if payload.len() < 12 {
        return Err(Error::MalformedChallengeResponse(payload.len()));
    }
    let scp_id = payload[11];
    match scp_id {
        scp_id::SCP02 => {
            if payload.len() != SCP02_RESPONSE_LENGTH {
                return Err(Error::MalformedChallengeResponse(payload.len()));
            }
            let mut card_challenge = [0u8; 8];
            card_challenge.copy_from_slice(&payload[12..20]);
            let mut card_cryptogram = [0u8; 8];
            card_cryptogram.copy_from_slice(&payload[20..28]);
            Ok(ChallengeResponse::Scp02 {
                card_challenge,
                card_cryptogram,
            })
        }
        scp_id::SCP03 => {
            if payload.len() < SCP03_RESPONSE_LENGTH {
                return Err(Error::MalformedChallengeResponse(payload.len()));
            }
            let mut sequence_counter = [0u8; 3];
            sequence_counter.copy_from_slice(&payload[12..15]);
            let mut card_challenge = [0u8; 8];
            card_challenge.copy_from_slice(&payload[15..23]);
            let mut card_cryptogram = [0u8; 8];
            card_cryptogram.copy_from_slice(&payload[23..31]);
            Ok(ChallengeResponse::Scp03 {
                sequence_counter,
                card_challenge,
                card_cryptogram,
            })
        }
        other => Err(Error::UnsupportedProtocol(other)),
    }
}

/// Transmit `command` raw over `transport` and require a `9000` status,
/// returning the response payload.
pub fn transmit_expecting_success(
    transport: &mut dyn cardmgr_apdu_core::CardTransport,
    command: &Command,
) -> Result<Bytes> {
    let raw = transport.transmit_raw(&command.to_bytes())?;
    let response = Response::from_bytes(&raw)?;
    if !response.is_success() {
        return Err(Error::HandshakeFailed(response.status()));
    }
    Ok(response.payload().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn builds_initialize_update_command() {
        let host_challenge = hex!("0102030405060708");
        let cmd = build_initialize_update(0x00, &host_challenge);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("8050000008010203040506070800"));
    }

    #[test]
    fn parses_scp02_response() {
        let mut payload = vec![0u8; 10];
        payload.push(0x01); // KVN
        payload.push(0x02); // SCP_ID
        payload.extend_from_slice(&[0xAA; 8]);
        payload.extend_from_slice(&[0xBB; 8]);

        match parse_challenge_response(&payload).unwrap() {
            ChallengeResponse::Scp02 {
                card_challenge,
                card_cryptogram,
            } => {
                assert_eq!(card_challenge, [0xAA; 8]);
                assert_eq!(card_cryptogram, [0xBB; 8]);
            }
            ChallengeResponse::Scp03 { .. } => panic!("expected SCP02"),
        }
    }

    #[test]
    fn parses_scp03_response() {
        let mut payload = vec![0u8; 10];
        payload.push(0x01);
        payload.push(0x03); // SCP_ID
        payload.extend_from_slice(&[0x01, 0x02, 0x03]); // sequence counter
        payload.extend_from_slice(&[0xCC; 8]);
        payload.extend_from_slice(&[0xDD; 8]);

        match parse_challenge_response(&payload).unwrap() {
            ChallengeResponse::Scp03 {
                sequence_counter,
                card_challenge,
                card_cryptogram,
            } => {
                assert_eq!(sequence_counter, [0x01, 0x02, 0x03]);
                assert_eq!(card_challenge, [0xCC; 8]);
                assert_eq!(card_cryptogram, [0xDD; 8]);
            }
            ChallengeResponse::Scp02 { .. } => panic!("expected SCP03"),
        }
    }

    #[test]
    fn rejects_unknown_scp_id() {
        let mut payload = vec![0u8; 28];
        payload[11] = 0x01;
        assert!(matches!(
            parse_challenge_response(&payload),
            Err(Error::UnsupportedProtocol(0x01))
        ));
    }

    #[test]
    fn rejects_short_response() {
        assert!(parse_challenge_response(&[0u8; 5]).is_err());
    }

    #[test]
    fn host_challenges_are_not_constant() {
        // Astronomically unlikely to collide unless the CSPRNG is broken.
        assert_ne!(host_challenge(), host_challenge());
    }
}
