//! SCP02 secure channel: handshake and per-APDU wrap/unwrap.

use cardmgr_apdu_core::{CardTransport, Command, Response};
use cardmgr_crypto::scp02::{self, CommandWrapper, SessionKeys, StaticKeys};
use tracing::debug;

use crate::constants::{self, CLA_EXT_AUTH, INS_EXTERNAL_AUTHENTICATE};
use crate::error::{Error, Result};
use crate::handshake::{self, ChallengeResponse};
use crate::level::SecurityLevel;

/// An established SCP02 channel: session keys, the command-MAC wrapper (and
/// its chaining ICV), and the negotiated security level.
pub struct Scp02Channel {
    keys: SessionKeys,
    wrapper: CommandWrapper,
    security_level: SecurityLevel,
    established: bool,
}

impl std::fmt::Debug for Scp02Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scp02Channel")
            .field("security_level", &self.security_level)
            .field("established", &self.established)
            .finish_non_exhaustive()
    }
}

impl Scp02Channel {
    /// Run the SCP02 handshake over `transport`, returning the established
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

        let (card_challenge, card_cryptogram) = match handshake::parse_challenge_response(&payload)? {
            ChallengeResponse::Scp02 {
                card_challenge,
                card_cryptogram,
            } => (card_challenge, card_cryptogram),
            ChallengeResponse::Scp03 { .. } => {
                return Err(Error::UnsupportedProtocol(constants::scp_id::SCP03))
            }
        };

        // GlobalPlatform Amendment E constant derivation uses the card
        // challenge's first two bytes as the sequence counter.
        let seq: [u8; 2] = card_challenge[..2].try_into().expect("2 bytes");
        let keys = SessionKeys::derive(static_keys, &seq)?;

        let expected = scp02::calculate_cryptogram(&keys.enc, &card_challenge, &host_challenge, false)?;
        if expected != card_cryptogram {
            return Err(Error::CryptogramMismatch);
        }
        debug!("scp02 card cryptogram verified");

        let host_cryptogram =
            scp02::calculate_cryptogram(&keys.enc, &card_challenge, &host_challenge, true)?;

        let mut wrapper = CommandWrapper::new(keys.mac.clone());
        let ext_auth_data = wrapper.wrap(
            CLA_EXT_AUTH,
            INS_EXTERNAL_AUTHENTICATE,
            security_level.to_p1(),
            0x00,
            &host_cryptogram,
            None,
        )?;
        let ext_auth_cmd = Command::new_with_data(
            CLA_EXT_AUTH,
            INS_EXTERNAL_AUTHENTICATE,
            security_level.to_p1(),
            0x00,
            ext_auth_data,
        );
        handshake::transmit_expecting_success(transport, &ext_auth_cmd)?;
        debug!(?security_level, "scp02 channel established");

        Ok(Self {
            keys,
            wrapper,
            security_level,
            established: true,
        })
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

    pub(crate) fn process_command(
        &mut self,
        command: &Command,
        transport: &mut dyn CardTransport,
    ) -> cardmgr_apdu_core::Result<Response> {
        if !self.established {
            return Err(cardmgr_apdu_core::Error::NoSecureChannel);
        }

        if self.security_level.response_mac {
            // GlobalPlatform's classic SCP02 profile does not define R-MAC
            // the way SCP03 does; reject rather than silently skip the
            // check the caller asked for.
            self.established = false;
            return Err(cardmgr_apdu_core::Error::Processor(
                "R-MAC is not supported over SCP02".to_string(),
            ));
        }

        let enc_key = self.security_level.command_enc.then_some(&self.keys.enc);
        let wrap_result = self.wrapper.wrap(
            command.class(),
            command.instruction(),
            command.p1(),
            command.p2(),
            command.data().unwrap_or(&[]),
            enc_key,
        );
        let wrapped = match wrap_result {
            Ok(wrapped) => wrapped,
            Err(err) => {
                self.established = false;
                return Err(cardmgr_apdu_core::Error::Processor(err.to_string()));
            }
        };

        let wrapped_cmd = Command::new_with_data(
            command.class() | 0x04,
            command.instruction(),
            command.p1(),
            command.p2(),
            wrapped,
        );
        let raw = transport.transmit_raw(&wrapped_cmd.to_bytes())?;
        Response::from_bytes(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockTransport;
    use cardmgr_crypto::Key;

    fn channel(security_level: SecurityLevel, established: bool) -> Scp02Channel {
        let mac_key = Key::new([0x11u8; 16]);
        Scp02Channel {
            keys: SessionKeys {
                enc: Key::new([0x22u8; 16]),
                mac: mac_key.clone(),
                dek: Key::new([0x33u8; 16]),
            },
            wrapper: CommandWrapper::new(mac_key),
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
    fn response_mac_is_rejected_and_closes_channel() {
        let mut ch = channel(SecurityLevel::FULL, true);
        let mut transport = MockTransport::with_response(vec![0x90, 0x00]);
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
}
