//! SCP02 (3DES-based) key derivation, cryptograms and the retail MAC used
//! for command wrapping. Grounded on
//! `crates/globalplatform/src/crypto.rs` and `secure_channel.rs`.

use cbc::cipher::{BlockEncryptMut, KeyInit, KeyIvInit};
use des::{Des, TdesEde3};

use crate::error::{Error, Result};
use crate::{Key, pad_iso7816};

/// Derivation purpose constant for the session ENC key.
pub const DERIVATION_ENC: [u8; 2] = [0x01, 0x82];
/// Derivation purpose constant for the session C-MAC key.
pub const DERIVATION_MAC: [u8; 2] = [0x01, 0x01];
/// Derivation purpose constant for the session DEK key.
pub const DERIVATION_DEK: [u8; 2] = [0x01, 0x81];

/// Resize a 16-byte double-length key into a 24-byte 3DES-EDE3 key by
/// repeating the first 8 bytes as the third DES key (2-key triple DES).
pub fn resize_key(key: &Key) -> [u8; 24] {
    let mut out = [0u8; 24];
    out[..16].copy_from_slice(&key.0);
    out[16..].copy_from_slice(&key.0[..8]);
    out
}

/// Static card key material as stored: either a 16-byte double-length key
/// (resized the same way as [`resize_key`]) or an already-24-byte
/// triple-length 3DES key, both of which spec.md §3 allows.
#[derive(Clone, zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct StaticKey(Vec<u8>);

impl StaticKey {
    /// Build from raw bytes, validating the 16-or-24-byte length
    /// GlobalPlatform static keysets allow.
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        match bytes.len() {
            16 | 24 => Ok(Self(bytes)),
            other => Err(Error::InvalidKeyLength(other)),
        }
    }

    fn as_des3(&self) -> [u8; 24] {
        let mut out = [0u8; 24];
        if self.0.len() == 16 {
            out[..16].copy_from_slice(&self.0);
            out[16..].copy_from_slice(&self.0[..8]);
        } else {
            out.copy_from_slice(&self.0);
        }
        out
    }
}

impl std::fmt::Debug for StaticKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StaticKey({} bytes, redacted)", self.0.len())
    }
}

impl TryFrom<&[u8]> for StaticKey {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        Self::new(value.to_vec())
    }
}

/// Derive a session key from a static card key, the card's sequence
/// counter and a derivation purpose, per GlobalPlatform Amendment E
/// constant derivation: 3DES-CBC-encrypt (zero IV) of
/// `purpose(2) || seq(2) || 00*12` under the resized static key.
pub fn derive_key(card_key: &StaticKey, seq: &[u8; 2], purpose: &[u8; 2]) -> Result<Key> {
    let mut derivation_data = [0u8; 16];
    derivation_data[0..2].copy_from_slice(purpose);
    derivation_data[2..4].copy_from_slice(seq);

    let key3 = card_key.as_des3();
    let encryptor = cbc::Encryptor::<TdesEde3>::new(&key3.into(), &[0u8; 8].into());
    let mut buf = derivation_data;
    encryptor
        .encrypt_padded_mut::<block_padding::NoPadding>(&mut buf, 16)
        .map_err(|_| Error::NotBlockAligned(16))?;

    Key::try_from(&buf[..])
}

/// Single-DES-all-but-last-block, 3DES-last-block retail MAC
/// (ISO/IEC 9797-1 MAC algorithm 3), as used for SCP02 cryptograms and
/// command MACs. `iv` chains forward across successive commands.
pub fn mac_full_3des(key: &Key, iv: &[u8; 8], data: &[u8]) -> Result<[u8; 8]> {
    let padded = pad_iso7816(data, 8);
    let key3 = resize_key(key);

    let mut chain = *iv;
    let des_key: [u8; 8] = key3[..8].try_into().unwrap();
    let single = Des::new(&des_key.into());

    let blocks: Vec<&[u8]> = padded.chunks(8).collect();
    for block in &blocks[..blocks.len() - 1] {
        let mut buf = [0u8; 8];
        for i in 0..8 {
            buf[i] = block[i] ^ chain[i];
        }
        single.encrypt_block_mut(&mut buf.into());
        chain = buf;
    }

    // Final block: full 3DES-CBC-encrypt of the chained value.
    let last = blocks[blocks.len() - 1];
    let mut final_block = [0u8; 8];
    for i in 0..8 {
        final_block[i] = last[i] ^ chain[i];
    }
    let encryptor = cbc::Encryptor::<TdesEde3>::new(&key3.into(), &[0u8; 8].into());
    let mut buf = final_block;
    encryptor
        .encrypt_padded_mut::<block_padding::NoPadding>(&mut buf, 8)
        .map_err(|_| Error::NotBlockAligned(8))?;

    Ok(buf)
}

/// Compute the host or card authentication cryptogram: the retail MAC of
/// the two challenges concatenated in the order the verifier expects,
/// under the session ENC key, zero IV.
///
/// `card_then_host` selects `card_challenge || host_challenge` (the host
/// cryptogram sent in EXTERNAL AUTHENTICATE) versus
/// `host_challenge || card_challenge` (the card cryptogram returned by
/// INITIALIZE UPDATE, which the host re-derives to authenticate the card).
pub fn calculate_cryptogram(
    enc_key: &Key,
    card_challenge: &[u8],
    host_challenge: &[u8],
    card_then_host: bool,
) -> Result<[u8; 8]> {
    let mut data = Vec::with_capacity(16);
    if card_then_host {
        data.extend_from_slice(card_challenge);
        data.extend_from_slice(host_challenge);
    } else {
        data.extend_from_slice(host_challenge);
        data.extend_from_slice(card_challenge);
    }
    mac_full_3des(enc_key, &[0u8; 8], &data)
}

/// Session key triple derived at INITIALIZE UPDATE time.
#[derive(Clone, zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct SessionKeys {
    /// Session ENC key (used for cryptograms and OTA command encryption).
    pub enc: Key,
    /// Session MAC key (used for command wrapping).
    pub mac: Key,
    /// Session DEK key (used to wrap key material in PUT KEY).
    pub dek: Key,
}

impl SessionKeys {
    /// Derive the session key triple from the static keyset and the card's
    /// sequence counter.
    pub fn derive(static_keys: &StaticKeys, seq: &[u8; 2]) -> Result<Self> {
        Ok(Self {
            enc: derive_key(&static_keys.enc, seq, &DERIVATION_ENC)?,
            mac: derive_key(&static_keys.mac, seq, &DERIVATION_MAC)?,
            dek: derive_key(&static_keys.dek, seq, &DERIVATION_DEK)?,
        })
    }
}

/// Static (card-diversified) SCP02 keyset: ENC, MAC, DEK.
#[derive(Clone, zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct StaticKeys {
    /// Static ENC key.
    pub enc: StaticKey,
    /// Static MAC key.
    pub mac: StaticKey,
    /// Static DEK key.
    pub dek: StaticKey,
}

/// Encrypt the chaining ICV under `enc_key` (single 3DES-CBC block, zero
/// IV), yielding the IV used to CBC-encrypt command data at security level
/// C-DEC (GlobalPlatform Amendment E, `secure_channel.rs::encrypt_icv`).
pub fn encrypt_icv(enc_key: &Key, icv: &[u8; 8]) -> Result<[u8; 8]> {
    let key3 = resize_key(enc_key);
    let encryptor = cbc::Encryptor::<TdesEde3>::new(&key3.into(), &[0u8; 8].into());
    let mut buf = *icv;
    encryptor
        .encrypt_padded_mut::<block_padding::NoPadding>(&mut buf, 8)
        .map_err(|_| Error::NotBlockAligned(8))?;
    Ok(buf)
}

/// ISO 7816-4 pad and 3DES-CBC-encrypt command data under the session ENC
/// key, IV = [`encrypt_icv`] of the current MAC chaining value.
pub fn encrypt_data(enc_key: &Key, icv: &[u8; 8], data: &[u8]) -> Result<Vec<u8>> {
    let padded = pad_iso7816(data, 8);
    let key3 = resize_key(enc_key);
    let encryptor = cbc::Encryptor::<TdesEde3>::new(&key3.into(), icv.into());
    let mut buf = padded;
    let len = buf.len();
    encryptor
        .encrypt_padded_mut::<block_padding::NoPadding>(&mut buf, len)
        .map_err(|_| Error::NotBlockAligned(len))?;
    Ok(buf)
}

/// Wraps outgoing commands with a chained retail MAC (GlobalPlatform
/// `CLA |= 0x04`, `Lc' = Lc + 8`, MAC appended to data), per
/// `secure_channel.rs::SCP02Wrapper`, optionally encrypting the data field
/// first at security level C-DEC.
#[derive(Clone)]
pub struct CommandWrapper {
    mac_key: Key,
    icv: [u8; 8],
}

impl CommandWrapper {
    /// Start a fresh wrapper with a zero initial chaining value.
    pub const fn new(mac_key: Key) -> Self {
        Self {
            mac_key,
            icv: [0u8; 8],
        }
    }

    /// Current MAC chaining value.
    pub const fn icv(&self) -> [u8; 8] {
        self.icv
    }

    /// Wrap one command's header+data, returning the new data field
    /// (possibly-encrypted data || 8-byte MAC) and updating the chaining
    /// ICV. `enc_key` encrypts `data` first (security level C-DEC) when
    /// present and non-empty.
    pub fn wrap(
        &mut self,
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: &[u8],
        enc_key: Option<&Key>,
    ) -> Result<Vec<u8>> {
        let data = match enc_key {
            Some(enc_key) if !data.is_empty() => {
                let data_icv = encrypt_icv(enc_key, &self.icv)?;
                encrypt_data(enc_key, &data_icv, data)?
            }
            _ => data.to_vec(),
        };

        let lc_prime = data.len() + 8;
        let mut mac_data = Vec::with_capacity(5 + data.len());
        mac_data.push(cla | 0x04);
        mac_data.push(ins);
        mac_data.push(p1);
        mac_data.push(p2);
        mac_data.push(lc_prime as u8);
        mac_data.extend_from_slice(&data);

        let mac = mac_full_3des(&self.mac_key, &self.icv, &mac_data)?;
        self.icv = mac;

        let mut out = data;
        out.extend_from_slice(&mac);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn derives_session_enc_key() {
        let card_key = StaticKey::new(hex!("404142434445464748494A4B4C4D4E4F").to_vec()).unwrap();
        let seq = hex!("0065");
        let derived = derive_key(&card_key, &seq, &DERIVATION_ENC).unwrap();
        assert_eq!(derived.0, hex!("85E72AAF47874218A202BF5EF891DD21"));
    }

    #[test]
    fn derives_session_key_from_24_byte_static_key() {
        let two_key = hex!("404142434445464748494A4B4C4D4E4F");
        let mut three_key = [0u8; 24];
        three_key[..16].copy_from_slice(&two_key);
        three_key[16..].copy_from_slice(&two_key[..8]);

        let from_16 = StaticKey::new(two_key.to_vec()).unwrap();
        let from_24 = StaticKey::new(three_key.to_vec()).unwrap();
        let seq = hex!("0065");
        assert_eq!(
            derive_key(&from_16, &seq, &DERIVATION_ENC).unwrap().0,
            derive_key(&from_24, &seq, &DERIVATION_ENC).unwrap().0
        );
    }

    #[test]
    fn retail_mac_matches_vector() {
        let key = Key::new(hex!("5B02E75AD63190AECE0622936F11ABAB"));
        let data = hex!("8482010010810B098A8FBB88DA");
        let mac = mac_full_3des(&key, &[0u8; 8], &data).unwrap();
        assert_eq!(mac, hex!("5271D7174A5A166A"));
    }

    #[test]
    fn wraps_and_chains_icv() {
        let mac_key = Key::new(hex!("2983BA77D709C2DAA1E6000ABCCAC951"));
        let mut wrapper = CommandWrapper::new(mac_key);
        let wrapped = wrapper
            .wrap(0x80, 0x82, 0x01, 0x00, &hex!("1D4DE92EAF7A2C9F"), None)
            .unwrap();
        assert_eq!(wrapped, hex!("1D4DE92EAF7A2C9F8F9B0DF681C1D3EC"));
        assert_eq!(wrapper.icv, hex!("8F9B0DF681C1D3EC"));
    }

    #[test]
    fn encrypted_wrap_differs_from_plain() {
        let mac_key = Key::new(hex!("2983BA77D709C2DAA1E6000ABCCAC951"));
        let enc_key = Key::new(hex!("404142434445464748494A4B4C4D4E4F"));
        let data = hex!("0102030405060708");

        let plain = CommandWrapper::new(mac_key.clone())
            .wrap(0x80, 0xE6, 0x0C, 0x00, &data, None)
            .unwrap();
        let encrypted = CommandWrapper::new(mac_key)
            .wrap(0x80, 0xE6, 0x0C, 0x00, &data, Some(&enc_key))
            .unwrap();

        assert_ne!(plain, encrypted);
        // Encrypted data is ISO 7816-4 padded to the next 8-byte block, so
        // the wrapped length grows by a full block versus the plain wrap.
        assert_eq!(encrypted.len(), plain.len() + 8);
    }
}
