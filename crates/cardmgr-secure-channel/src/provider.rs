//! [`SecureChannelProvider`] factory, used by the session façade so it does
//! not need to name a concrete SCP02/SCP03 type up front.

use cardmgr_apdu_core::processor::secure::{SecureChannel, SecureChannelProvider};
use cardmgr_apdu_core::CardTransport;
use cardmgr_crypto::{scp02, scp03};

use crate::channel::SecureChannelSession;
use crate::constants::ANY_KVN;
use crate::level::SecurityLevel;
use crate::scp02_channel::Scp02Channel;
use crate::scp03_channel::Scp03Channel;

/// Static keyset for either protocol. A stored keyset (`cardmgr-store`) is
/// tagged with the protocol it was provisioned for; there is no
/// autodetection of which static keys to try.
#[derive(Clone)]
pub enum StaticKeys {
    /// SCP02 (3DES) static keys.
    Scp02(scp02::StaticKeys),
    /// SCP03 (AES-128) static keys.
    Scp03(scp03::StaticKeys),
}

impl std::fmt::Debug for StaticKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scp02(_) => write!(f, "StaticKeys::Scp02(redacted)"),
            Self::Scp03(_) => write!(f, "StaticKeys::Scp03(redacted)"),
        }
    }
}

/// Opens a GlobalPlatform secure channel (SCP02 or SCP03, chosen by which
/// [`StaticKeys`] variant is supplied) at a configured security level and
/// key version number.
#[derive(Debug, Clone)]
pub struct GpSecureChannelProvider {
    keys: StaticKeys,
    kvn: u8,
    security_level: SecurityLevel,
}

impl GpSecureChannelProvider {
    /// Build a provider for `keys` at `security_level`, targeting whichever
    /// key version number is current on the card ([`ANY_KVN`]).
    pub const fn new(keys: StaticKeys, security_level: SecurityLevel) -> Self {
        Self {
            keys,
            kvn: ANY_KVN,
            security_level,
        }
    }

    /// Override the key version number to target.
    pub const fn with_kvn(mut self, kvn: u8) -> Self {
        self.kvn = kvn;
        self
    }
}

impl SecureChannelProvider for GpSecureChannelProvider {
    fn create_secure_channel(
        &self,
        transport: &mut dyn CardTransport,
    ) -> cardmgr_apdu_core::Result<Box<dyn SecureChannel>> {
        let session = match &self.keys {
            StaticKeys::Scp02(keys) => SecureChannelSession::Scp02(
                Scp02Channel::open(transport, keys, self.kvn, self.security_level)
                    .map_err(|err| cardmgr_apdu_core::Error::Processor(err.to_string()))?,
            ),
            StaticKeys::Scp03(keys) => SecureChannelSession::Scp03(
                Scp03Channel::open(transport, keys, self.kvn, self.security_level)
                    .map_err(|err| cardmgr_apdu_core::Error::Processor(err.to_string()))?,
            ),
        };
        Ok(Box::new(session))
    }
}
