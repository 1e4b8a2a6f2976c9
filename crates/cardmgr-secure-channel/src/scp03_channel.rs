//! SCP03 secure channel: handshake and per-APDU wrap/unwrap, including
//! optional R-MAC/R-ENC response protection.

use cardmgr_apdu_core::{CardTransport, Command, Response};
use cardmgr_crypto::scp03::{self, SessionKeys, StaticKeys};
use cardmgr_crypto::{unpad_iso7816, Key};
use tracing::debug;

use crate::constants::{self, CLA_EXT_AUTH, INS_EXTERNAL_AUTHENTICATE};
use crate::error::{Error, Result};
use crate::handshake::{self, ChallengeResponse};
use crate::level::SecurityLevel;

/// An established SCP03 channel: session keys, MAC chaining value, command
/// counter, and the negotiated security level.
pub struct Scp03Channel {
    keys: SessionKeys,
    mac_chaining_value: [u8; 16],
    counter: u32,
    security_level: SecurityLevel,
    established: bool,
}

impl std::fmt::Debug for Scp03Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scp03Channel")
            .field("counter", &self.counter)
            .field("security_level", &self.security_level)
            .field("established", &self.established)
            .finish_non_exhaustive()
    }
}

impl Scp03Channel {
    /// Run the SCP03 handshake over `transport`, returning the established
    /// channel.
    pub fn open(
        transport: &mut dyn CardTransport,
        static_keys: &StaticKeys,
        kvn: u8,
        security_level: SecurityLevel,
    ) -> Result<Self> {
        let host_challenge = handshake::host_challenge();
        let init_cmd = handshake::build_initialize_update(kvn, &host_challenge);
        let payload = handshake::transmit_expecting_success(transport, &init_cmd)?;

        let card_challenge = match handshake::parse_challenge_response(&payload)? {
            ChallengeResponse::Scp03 {
                card_challenge,
                card_cryptogram,
                ..
            } => {
                let keys_probe = SessionKeys::derive(static_keys, &host_challenge, &card_challenge);
                scp03::verify_card_cryptogram(
                    &keys_probe.senc,
                    &host_challenge,
                    &card_challenge,
                    &card_cryptogram,
                )?;
                card_challenge
            }
            ChallengeResponse::Scp02 { .. } => {
                return Err(Error::UnsupportedProtocol(constants::scp_id::SCP02))
            }
        };
        debug!("scp03 card cryptogram verified");

        let keys = SessionKeys::derive(static_keys, &host_challenge, &card_challenge);
        let host_cryptogram = scp03::host_cryptogram(&keys.senc, &host_challenge, &card_challenge);

        let mut channel = Self {
            keys,
            mac_chaining_value: [0u8; 16],
            counter: 0,
            security_level,
            established: true,
        };

        let ext_auth_cmd = Command::new(
            CLA_EXT_AUTH,
            INS_EXTERNAL_AUTHENTICATE,
            security_level.to_p1(),
            0x00,
        )
        .with_data(host_cryptogram.to_vec());
        let wrapped = channel.wrap_command(&ext_auth_cmd)?;
        handshake::transmit_expecting_success(transport, &wrapped)?;
        debug!(?security_level, "scp03 channel established");

        Ok(channel)
    }

    pub(crate) const fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    pub(crate) const fn is_established(&self) -> bool {
        self.established
    }

    pub(crate) fn close(&mut self) {
        self.established = false;
    }

    fn wrap_command(&mut self, command: &Command) -> Result<Command> {
        self.counter += 1;
        let mut data = command.data().unwrap_or(&[]).to_vec();

        if self.security_level.command_enc && !data.is_empty() {
            let icv = scp03::derive_icv(&self.keys.senc, self.counter);
            let padded = scp03::pad(&data);
            data = scp03::encrypt_cbc(&self.keys.senc, &icv, &padded)?;
        }

        let cla = command.class() | 0x04;
        let lc_prime = (data.len() + 8) as u8;
        let mut mac_data = Vec::with_capacity(5 + data.len());
        mac_data.push(cla);
        mac_data.push(command.instruction());
        mac_data.push(command.p1());
        mac_data.push(command.p2());
        mac_data.push(lc_prime);
        mac_data.extend_from_slice(&data);

        let tag = scp03::cmac_chained(&self.keys.smac, &self.mac_chaining_value, &mac_data);
        self.mac_chaining_value = tag;
        data.extend_from_slice(&tag[..8]);

        Ok(Command::new_with_data(
            cla,
            command.instruction(),
            command.p1(),
            command.p2(),
            data,
        ))
    }

    fn unwrap_response(&self, response: &Response) -> Result<Response> {
        if !self.security_level.response_mac {
            return Ok(response.clone());
        }

        let payload = response.payload();
        if payload.len() < 8 {
            return Err(Error::ResponseMacMismatch);
        }
        let (body, mac) = payload.split_at(payload.len() - 8);

        let mut mac_data = body.to_vec();
        mac_data.push(response.status().sw1);
        mac_data.push(response.status().sw2);
        let expected = scp03::cmac_chained(&self.keys.srmac, &self.mac_chaining_value, &mac_data);
        if &expected[..8] != mac {
            return Err(Error::ResponseMacMismatch);
        }

        let body = if self.security_level.command_enc && !body.is_empty() {
            decrypt_response_body(&self.keys.senc, self.counter, body)?
        } else {
            body.to_vec()
        };

        let mut raw = body;
        raw.push(response.status().sw1);
        raw.push(response.status().sw2);
        Response::from_bytes(&raw).map_err(Error::Apdu)
    }

    pub(crate) fn process_command(
        &mut self,
        command: &Command,
        transport: &mut dyn CardTransport,
    ) -> cardmgr_apdu_core::Result<Response> {
        if !self.established {
            return Err(cardmgr_apdu_core::Error::NoSecureChannel);
        }

        let wrapped = self.wrap_command(command).map_err(|err| {
            self.established = false;
            cardmgr_apdu_core::Error::Processor(err.to_string())
        })?;

        let raw = transport.transmit_raw(&wrapped.to_bytes())?;
        let response = Response::from_bytes(&raw)?;

        self.unwrap_response(&response).map_err(|err| {
            self.established = false;
            cardmgr_apdu_core::Error::Processor(err.to_string())
        })
    }
}

fn decrypt_response_body(senc: &Key, counter: u32, body: &[u8]) -> Result<Vec<u8>> {
    // Response ICV uses bit 0x80 set on the counter's top byte
    // (GPC_SPE_014 §6.2.7), distinguishing it from the command ICV.
    let mut icv = scp03::derive_icv(senc, counter);
    icv[0] |= 0x80;
    let decrypted = scp03::decrypt_cbc(senc, &icv, body)?;
    Ok(unpad_iso7816(&decrypted)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockTransport;

    fn channel(security_level: SecurityLevel, established: bool) -> Scp03Channel {
        Scp03Channel {
            keys: SessionKeys {
                senc: Key::new([0x11u8; 16]),
                smac: Key::new([0x22u8; 16]),
                srmac: Key::new([0x33u8; 16]),
            },
            mac_chaining_value: [0u8; 16],
            counter: 0,
            security_level,
            established,
        }
    }

    #[test]
    fn closed_channel_rejects_commands() {
        let mut ch = channel(SecurityLevel::MAC, false);
        let mut transport = MockTransport::with_response(vec![0x90, 0x00]);
        let cmd = Command::new(0x00, 0xA4, 0x04, 0x00);
        let err = ch.process_command(&cmd, &mut transport).unwrap_err();
        assert!(matches!(err, cardmgr_apdu_core::Error::NoSecureChannel));
    }

    #[test]
    fn invalid_response_mac_is_rejected_and_closes_channel() {
        let mut ch = channel(SecurityLevel::FULL, true);
        // 8-byte all-zero trailing "MAC" that cannot match the R-MAC
        // actually computed over an empty body, since SecurityLevel::FULL
        // requires response_mac.
        let mut transport = MockTransport::with_response(vec![
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x90, 0x00,
        ]);
        let cmd = Command::new(0x00, 0xA4, 0x04, 0x00);
        assert!(ch.process_command(&cmd, &mut transport).is_err());
        assert!(!ch.is_established());
    }

    #[test]
    fn wraps_command_with_secure_messaging_bit() {
        let mut ch = channel(SecurityLevel::MAC, true);
        let mut transport = MockTransport::with_response(vec![0x90, 0x00]);
        let cmd = Command::new_with_data(0x00, 0xA4, 0x04, 0x00, hex_literal::hex!("A000").to_vec());
        ch.process_command(&cmd, &mut transport).unwrap();

        let sent = transport.sent();
        let sent = sent.first().unwrap();
        assert_eq!(sent[0], 0x04); // secure-messaging bit set on CLA 0x00
        assert_eq!(sent[4], 0x02 + 8); // Lc' = original data len + MAC
    }

    #[test]
    fn encryption_level_changes_wrapped_bytes() {
        let mut plain = channel(SecurityLevel::MAC, true);
        let mut encrypted = channel(SecurityLevel::MAC_ENC, true);
        let data = hex_literal::hex!("0102030405060708").to_vec();

        let mut t1 = MockTransport::with_response(vec![0x90, 0x00]);
        let mut t2 = MockTransport::with_response(vec![0x90, 0x00]);
        let cmd = Command::new_with_data(0x00, 0xA4, 0x04, 0x00, data);
        plain.process_command(&cmd, &mut t1).unwrap();
        encrypted.process_command(&cmd, &mut t2).unwrap();

        assert_ne!(t1.sent().first().unwrap(), t2.sent().first().unwrap());
    }

    #[test]
    fn mac_chaining_value_advances_with_each_command() {
        let mut ch = channel(SecurityLevel::MAC, true);
        let mut transport = MockTransport::with_responses(vec![
            bytes::Bytes::from_static(&[0x90, 0x00]),
            bytes::Bytes::from_static(&[0x90, 0x00]),
        ]);
        let cmd = Command::new(0x00, 0xA4, 0x04, 0x00);

        ch.process_command(&cmd, &mut transport).unwrap();
        let first_chain = ch.mac_chaining_value;
        assert_ne!(first_chain, [0u8; 16]);

        ch.process_command(&cmd, &mut transport).unwrap();
        assert_ne!(ch.mac_chaining_value, first_chain);
    }
}
