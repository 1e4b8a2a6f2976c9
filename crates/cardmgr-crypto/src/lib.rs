//! Cryptographic primitives for GlobalPlatform secure channels (SCP02,
//! SCP03) and the OTA envelope builder, grounded on
//! `nexum-apdu-globalplatform::crypto` (SCP02) and the SP 800-108
//! CMAC-counter KDF used by `iqlusioninc-yubihsm.rs` (SCP03).
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod scp02;
pub mod scp03;

pub use error::{Error, Result};

/// 16-byte symmetric key, zeroized on drop. Used for both the 3DES-keyed
/// (resized to 24 bytes internally) SCP02 keys and the AES-128 SCP03 keys.
#[derive(Clone, zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct Key(pub [u8; 16]);

impl Key {
    /// Build a key from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw key bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Key({} bytes, redacted)", self.0.len())
    }
}

impl TryFrom<&[u8]> for Key {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        let bytes: [u8; 16] = value
            .try_into()
            .map_err(|_| Error::InvalidKeyLength(value.len()))?;
        Ok(Self(bytes))
    }
}

/// ISO 7816-4 padding (`80` then zero bytes to the next block boundary).
/// Used by OTA command encryption per spec.md §4.7 (distinct from the
/// prototype's PKCS#7 — see DESIGN.md Open Question resolutions).
pub fn pad_iso7816(data: &[u8], block_size: usize) -> Vec<u8> {
    let mut padded = data.to_vec();
    padded.push(0x80);
    while padded.len() % block_size != 0 {
        padded.push(0x00);
    }
    padded
}

/// Strip ISO 7816-4 padding, if present and well-formed.
pub fn unpad_iso7816(data: &[u8]) -> Result<Vec<u8>> {
    let pos = data
        .iter()
        .rposition(|&b| b != 0x00)
        .ok_or(Error::InvalidPadding)?;
    if data[pos] != 0x80 {
        return Err(Error::InvalidPadding);
    }
    Ok(data[..pos].to_vec())
}
