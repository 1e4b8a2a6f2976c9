//! SCP03 (AES-128-based) key derivation, cryptograms and CMAC chaining.
//! Grounded on the NIST SP 800-108 CMAC-counter KDF used by
//! `iqlusioninc-yubihsm.rs`'s `session::securechannel::kdf`, adapted to
//! GlobalPlatform's own derivation constants and wire format (GPC_SPE_014
//! Amendment D) rather than the YubiHSM 2 custom framing that example ships.

use aes::Aes128;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cmac::Cmac;
use digest::Mac;

use crate::error::{Error, Result};
use crate::{Key, pad_iso7816};

/// Derivation constant for the S-ENC session key.
pub const DERIVATION_ENC: u8 = 0x04;
/// Derivation constant for the S-MAC session key.
pub const DERIVATION_MAC: u8 = 0x06;
/// Derivation constant for the S-RMAC session key.
pub const DERIVATION_RMAC: u8 = 0x07;
/// Derivation constant for the card/host authentication cryptograms.
pub const DERIVATION_CARD_CRYPTOGRAM: u8 = 0x00;
/// Derivation constant for the host authentication cryptogram.
pub const DERIVATION_HOST_CRYPTOGRAM: u8 = 0x01;

/// Run SCP03's KDF: CMAC-AES as the PRF of a NIST SP 800-108 counter-mode
/// KDF, with the "fixed input data" specific to SCP03 (GPC_SPE_014 §4.1.5).
///
/// `context` is `host_challenge || card_challenge` (16 bytes) for session
/// key derivation, or the same pair for cryptogram derivation. `output` may
/// be up to 16 bytes (one AES block); SCP03 never derives more in one call.
pub fn derive(mac_key: &Key, derivation_constant: u8, context: &[u8], output: &mut [u8]) {
    assert!(output.len() <= 16, "derives at most one AES block");

    let mut input = [0u8; 32];
    // "label": 11 zero bytes followed by the 1-byte derivation constant.
    input[11] = derivation_constant;
    // "separation indicator": one zero byte.
    input[12] = 0x00;
    // "L": length of derived data, in bits, big-endian u16.
    let bits = (output.len() * 8) as u16;
    input[13..15].copy_from_slice(&bits.to_be_bytes());
    // "i": KDF counter. Always 1 since we never derive more than one block.
    input[15] = 0x01;
    input[16..16 + context.len()].copy_from_slice(context);

    let mut mac = Cmac::<Aes128>::new_from_slice(&mac_key.0).expect("16-byte key");
    mac.update(&input[..16 + context.len()]);
    let tag = mac.finalize().into_bytes();
    output.copy_from_slice(&tag[..output.len()]);
}

/// Session key triple plus the R-MAC key, derived at INITIALIZE UPDATE time.
#[derive(Clone, zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct SessionKeys {
    /// Session ENC key (S-ENC).
    pub senc: Key,
    /// Session C-MAC key (S-MAC).
    pub smac: Key,
    /// Session R-MAC key (S-RMAC).
    pub srmac: Key,
}

impl SessionKeys {
    /// Derive `(S-ENC, S-MAC, S-RMAC)` from the static key set and the
    /// handshake challenges.
    pub fn derive(static_keys: &StaticKeys, host_challenge: &[u8; 8], card_challenge: &[u8; 8]) -> Self {
        let mut context = [0u8; 16];
        context[..8].copy_from_slice(host_challenge);
        context[8..].copy_from_slice(card_challenge);

        let mut senc = [0u8; 16];
        derive(&static_keys.enc, DERIVATION_ENC, &context, &mut senc);
        let mut smac = [0u8; 16];
        derive(&static_keys.mac, DERIVATION_MAC, &context, &mut smac);
        let mut srmac = [0u8; 16];
        derive(&static_keys.mac, DERIVATION_RMAC, &context, &mut srmac);

        Self {
            senc: Key::new(senc),
            smac: Key::new(smac),
            srmac: Key::new(srmac),
        }
    }
}

/// Static AES-128 SCP03 keyset: ENC, MAC, DEK.
#[derive(Clone, zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct StaticKeys {
    /// Static ENC key.
    pub enc: Key,
    /// Static MAC key.
    pub mac: Key,
    /// Static DEK key.
    pub dek: Key,
}

/// Compute the card or host authentication cryptogram (8 bytes, the first
/// half of a CMAC-AES tag computed with S-ENC over the handshake context).
pub fn calculate_cryptogram(
    senc: &Key,
    host_challenge: &[u8; 8],
    card_challenge: &[u8; 8],
    which: u8,
) -> [u8; 8] {
    let mut context = [0u8; 16];
    context[..8].copy_from_slice(host_challenge);
    context[8..].copy_from_slice(card_challenge);

    let mut full = [0u8; 16];
    derive(senc, which, &context, &mut full);
    let mut out = [0u8; 8];
    out.copy_from_slice(&full[..8]);
    out
}

/// Verify the card's authentication cryptogram from INITIALIZE UPDATE.
pub fn verify_card_cryptogram(
    senc: &Key,
    host_challenge: &[u8; 8],
    card_challenge: &[u8; 8],
    card_cryptogram: &[u8; 8],
) -> Result<()> {
    let expected = calculate_cryptogram(
        senc,
        host_challenge,
        card_challenge,
        DERIVATION_CARD_CRYPTOGRAM,
    );
    if expected == *card_cryptogram {
        Ok(())
    } else {
        Err(Error::CryptogramMismatch)
    }
}

/// Compute the host authentication cryptogram sent in EXTERNAL AUTHENTICATE.
pub fn host_cryptogram(senc: &Key, host_challenge: &[u8; 8], card_challenge: &[u8; 8]) -> [u8; 8] {
    calculate_cryptogram(
        senc,
        host_challenge,
        card_challenge,
        DERIVATION_HOST_CRYPTOGRAM,
    )
}

/// Compute a full 16-byte CMAC-AES tag over `chain || data`, where `chain`
/// is either the all-zero initial chaining value or the previous command's
/// full tag (GPC_SPE_014 §6.2.3). Returns the full tag; callers truncate to
/// the first 8 bytes for the wire MAC and keep the full tag as the new
/// chaining value.
pub fn cmac_chained(mac_key: &Key, chain: &[u8; 16], data: &[u8]) -> [u8; 16] {
    let mut mac = Cmac::<Aes128>::new_from_slice(&mac_key.0).expect("16-byte key");
    mac.update(chain);
    mac.update(data);
    let tag = mac.finalize().into_bytes();
    let mut out = [0u8; 16];
    out.copy_from_slice(&tag);
    out
}

/// AES-128-CBC encrypt `data` (already ISO 7816-4 padded by the caller)
/// under `key` with the given `iv`.
pub fn encrypt_cbc(key: &Key, iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % 16 != 0 {
        return Err(Error::NotBlockAligned(data.len()));
    }
    let encryptor = cbc::Encryptor::<Aes128>::new(&key.0.into(), iv.into());
    let mut buf = data.to_vec();
    encryptor
        .encrypt_padded_mut::<block_padding::NoPadding>(&mut buf, data.len())
        .map_err(|_| Error::NotBlockAligned(data.len()))?;
    Ok(buf)
}

/// AES-128-CBC decrypt `data` under `key` with the given `iv`. Caller strips
/// ISO 7816-4 padding from the result (see [`crate::unpad_iso7816`]).
pub fn decrypt_cbc(key: &Key, iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % 16 != 0 {
        return Err(Error::NotBlockAligned(data.len()));
    }
    let decryptor = cbc::Decryptor::<Aes128>::new(&key.0.into(), iv.into());
    let mut buf = data.to_vec();
    decryptor
        .decrypt_padded_mut::<block_padding::NoPadding>(&mut buf)
        .map_err(|_| Error::NotBlockAligned(data.len()))?;
    Ok(buf)
}

/// Derive the ICV used to encrypt command data: AES-ECB-encrypt the
/// (zero-padded) command counter under S-ENC (GPC_SPE_014 §6.2.6).
pub fn derive_icv(senc: &Key, counter: u32) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[12..].copy_from_slice(&counter.to_be_bytes());
    let encryptor = cbc::Encryptor::<Aes128>::new(&senc.0.into(), &[0u8; 16].into());
    let mut buf = block;
    encryptor
        .encrypt_padded_mut::<block_padding::NoPadding>(&mut buf, 16)
        .expect("block aligned");
    buf
}

/// Pad `data` to an AES block boundary (ISO 7816-4).
pub fn pad(data: &[u8]) -> Vec<u8> {
    pad_iso7816(data, 16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    /// Scenario S5 / property P3: fixed all-zero static key and challenges
    /// must derive the same S_ENC on every run.
    #[test]
    fn senc_all_zero_is_deterministic() {
        let key = Key::new([0u8; 16]);
        let context = [0u8; 16];
        let mut a = [0u8; 16];
        derive(&key, DERIVATION_ENC, &context, &mut a);
        let mut b = [0u8; 16];
        derive(&key, DERIVATION_ENC, &context, &mut b);
        assert_eq!(a, b);
        assert_eq!(a, hex!("D119A7CCA75F050B4F306C8E1E5CC554"));
    }

    #[test]
    fn kdf_is_deterministic() {
        let key = Key::new(hex!("000102030405060708090A0B0C0D0E0F"));
        let ctx: [u8; 16] = hex!("00000000000000001111111111111111");
        let mut a = [0u8; 16];
        derive(&key, DERIVATION_MAC, &ctx, &mut a);
        let mut b = [0u8; 16];
        derive(&key, DERIVATION_MAC, &ctx, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn session_keys_differ_by_label() {
        let static_keys = StaticKeys {
            enc: Key::new(hex!("000102030405060708090A0B0C0D0E0F")),
            mac: Key::new(hex!("101112131415161718191A1B1C1D1E1F")),
            dek: Key::new(hex!("202122232425262728292A2B2C2D2E2F")),
        };
        let host = [0xAAu8; 8];
        let card = [0xBBu8; 8];
        let keys = SessionKeys::derive(&static_keys, &host, &card);
        assert_ne!(keys.senc.0, keys.smac.0);
        assert_ne!(keys.smac.0, keys.srmac.0);
    }

    #[test]
    fn cryptogram_roundtrip() {
        let senc = Key::new(hex!("000102030405060708090A0B0C0D0E0F"));
        let host = [0x11u8; 8];
        let card = [0x22u8; 8];
        let card_crypto = calculate_cryptogram(&senc, &host, &card, DERIVATION_CARD_CRYPTOGRAM);
        assert!(verify_card_cryptogram(&senc, &host, &card, &card_crypto).is_ok());

        let mut tampered = card_crypto;
        tampered[0] ^= 0x01;
        assert!(verify_card_cryptogram(&senc, &host, &card, &tampered).is_err());
    }

    #[test]
    fn mac_chain_progresses() {
        let mac_key = Key::new(hex!("000102030405060708090A0B0C0D0E0F"));
        let chain0 = [0u8; 16];
        let tag1 = cmac_chained(&mac_key, &chain0, b"command one");
        let tag2 = cmac_chained(&mac_key, &tag1, b"command two");
        assert_ne!(tag1, tag2);
        // Replaying the same chain + data reproduces the same tag
        // (the validator in the engine rejects replays by tracking chain
        // advancement, not by this function being non-deterministic).
        assert_eq!(cmac_chained(&mac_key, &chain0, b"command one"), tag1);
    }

    #[test]
    fn cbc_round_trips() {
        let key = Key::new(hex!("000102030405060708090A0B0C0D0E0F"));
        let iv = [0u8; 16];
        let plaintext = crate::pad_iso7816(b"response payload", 16);
        let ciphertext = encrypt_cbc(&key, &iv, &plaintext).unwrap();
        assert_ne!(ciphertext, plaintext);
        let decrypted = decrypt_cbc(&key, &iv, &ciphertext).unwrap();
        assert_eq!(crate::unpad_iso7816(&decrypted).unwrap(), b"response payload");
    }
}
