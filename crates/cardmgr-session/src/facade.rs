//! The session façade (spec.md §4.8): one object a caller holds that opens
//! a card channel, selects the Card Manager, optionally establishes a
//! secure channel, and offers the high-level operations everything else in
//! this workspace exists to support.

use cardmgr_apdu_core::card::{CardExecutor, Executor};
use cardmgr_apdu_core::processor::GetResponseProcessor;
use cardmgr_crypto::{scp02, scp03, Key};
use cardmgr_globalplatform::constants::DEFAULT_ISD_AID;
use cardmgr_globalplatform::descriptor::{ApplicationDescriptor, SecurityDomainDescriptor, StatusEntry};
use cardmgr_globalplatform::{
    create_security_domain, extradite, get_card_data, get_status, perform_clfdb, select_card_manager,
    ClfdbOperation, ClfdbScope, StatusScope,
};
use cardmgr_ota::{OtaBuilder, OtaClfdbOperation};
use cardmgr_secure_channel::{GpSecureChannelProvider, SecurityLevel, StaticKeys};
use cardmgr_store::{OtaMessage, Protocol, Store};
use cardmgr_transport_pcsc::{PcscCardManager, PcscTransport};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};

/// GlobalPlatform Card Specification tag `0x0066`: Card Data, read by
/// [`Session::card_info`].
const CARD_DATA_TAG: u16 = 0x0066;

fn static_keys_from(keyset: &cardmgr_store::Keyset) -> Result<StaticKeys> {
    Ok(match keyset.protocol {
        Protocol::Scp02 => StaticKeys::Scp02(scp02::StaticKeys {
            enc: scp02::StaticKey::new(keyset.enc.clone())?,
            mac: scp02::StaticKey::new(keyset.mac.clone())?,
            dek: scp02::StaticKey::new(keyset.dek.clone())?,
        }),
        Protocol::Scp03 => StaticKeys::Scp03(scp03::StaticKeys {
            enc: Key::try_from(keyset.enc.as_slice())?,
            mac: Key::try_from(keyset.mac.as_slice())?,
            dek: Key::try_from(keyset.dek.as_slice())?,
        }),
    })
}

fn security_level_from(level: u8) -> SecurityLevel {
    match level {
        1 => SecurityLevel::MAC,
        2 => SecurityLevel::MAC_ENC,
        _ => SecurityLevel::FULL,
    }
}

/// Summary of the connected card, returned by [`Session::card_info`].
#[derive(Debug, Clone)]
pub struct CardInfo {
    /// Answer-To-Reset.
    pub atr: Vec<u8>,
    /// Reader the card is connected through.
    pub reader_name: String,
    /// Issuer Security Domain AID this session selected.
    pub isd_aid: Vec<u8>,
    /// Raw GlobalPlatform Card Data object (tag `0x0066`).
    pub card_data: Vec<u8>,
}

/// A connected card, the Card Manager selected, and (optionally) an
/// established secure channel — the one object this workspace's CLI and
/// any other caller drives everything through.
#[derive(Debug)]
pub struct Session {
    executor: CardExecutor<PcscTransport>,
    store: Store,
    ota: OtaBuilder,
    isd_aid: Vec<u8>,
    authenticated: bool,
}

impl Session {
    /// Names of every PC/SC reader currently attached.
    pub fn list_readers() -> Result<Vec<String>> {
        Ok(PcscCardManager::new()?.list_readers()?)
    }

    /// Connect to `reader_name`, blocking up to `config.reader_timeout_ms`
    /// for a card, and select the Issuer Security Domain.
    pub fn connect(reader_name: &str, store: Store, config: &Config) -> Result<Self> {
        let manager = PcscCardManager::new()?;
        let transport = manager.connect(reader_name, config.reader_timeout_ms)?;
        let mut executor = CardExecutor::new_with_defaults(transport);

        let isd_aid = config
            .isd_aid
            .clone()
            .unwrap_or_else(|| DEFAULT_ISD_AID.to_vec());
        select_card_manager(&mut executor, Some(&isd_aid))?;

        info!(reader = reader_name, isd_aid = %hex::encode(&isd_aid), "session connected");

        let ota = OtaBuilder::new(store.clone());
        Ok(Self {
            executor,
            store,
            ota,
            isd_aid,
            authenticated: false,
        })
    }

    /// `true` once [`Session::establish_secure_channel`] has succeeded and
    /// no subsequent [`Session::close_secure_channel`] or failure has
    /// cleared it.
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Answer-To-Reset of the connected card.
    pub fn atr(&self) -> &[u8] {
        self.executor.transport().atr()
    }

    /// Name of the reader this session is bound to.
    pub fn reader_name(&self) -> &str {
        self.executor.transport().reader_name()
    }

    fn require_authenticated(&self) -> Result<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(Error::NotAuthenticated)
        }
    }

    /// Run the SCP02/SCP03 handshake using `keyset_name`/`value_set`'s
    /// stored keys, at `security_level` (defaulting to the keyset's own
    /// recorded default if not given).
    pub fn establish_secure_channel(
        &mut self,
        keyset_name: &str,
        value_set: &str,
        security_level: Option<u8>,
    ) -> Result<()> {
        let keyset = self.store.get_keyset(keyset_name, value_set)?;
        let level = security_level_from(security_level.unwrap_or(keyset.security_level));
        let static_keys = static_keys_from(&keyset)?;

        let provider = GpSecureChannelProvider::new(static_keys, level).with_kvn(keyset.key_version);
        self.executor.open_secure_channel(&provider)?;
        self.authenticated = true;

        debug!(keyset = keyset_name, value_set, "secure channel established");
        Ok(())
    }

    /// Tear down the active secure channel: GlobalPlatform has no explicit
    /// "close channel" APDU, so this resets the reader connection and
    /// re-selects the Card Manager, which drops the card's session keys.
    pub fn close_secure_channel(&mut self) -> Result<()> {
        self.executor.reset()?;
        self.executor
            .add_processor(Box::new(GetResponseProcessor::default()));
        select_card_manager(&mut self.executor, Some(&self.isd_aid))?;
        self.authenticated = false;
        debug!("secure channel closed");
        Ok(())
    }

    /// Every Security Domain on the card (ISD, SSDs, DMSDs).
    pub fn list_security_domains(&mut self) -> Result<Vec<SecurityDomainDescriptor>> {
        self.require_authenticated()?;
        let mut domains = Vec::new();
        for scope in [StatusScope::IssuerSecurityDomain, StatusScope::Applications] {
            let entries = get_status(&mut self.executor, scope, &self.isd_aid)?;
            domains.extend(entries.into_iter().filter_map(|entry| match entry {
                StatusEntry::SecurityDomain(domain) => Some(domain),
                StatusEntry::Application(_) => None,
            }));
        }
        Ok(domains)
    }

    /// Every ordinary (non-Security-Domain) application on the card.
    pub fn list_applications(&mut self) -> Result<Vec<ApplicationDescriptor>> {
        self.require_authenticated()?;
        let entries = get_status(&mut self.executor, StatusScope::Applications, &self.isd_aid)?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                StatusEntry::Application(app) => Some(app),
                StatusEntry::SecurityDomain(_) => None,
            })
            .collect())
    }

    /// Create a new (Supplementary/DM) Security Domain at `aid` with the
    /// given GlobalPlatform privileges byte (the Security-Domain bit
    /// `0x80` must already be set by the caller).
    pub fn create_sd(&mut self, aid: &[u8], privileges: u8) -> Result<()> {
        self.require_authenticated()?;
        create_security_domain(&mut self.executor, aid.to_vec(), privileges)?;
        Ok(())
    }

    /// Perform a CLFDB life-cycle transition (lock/unlock/terminate) on
    /// `target_aid`.
    pub fn clfdb(&mut self, target_aid: &[u8], scope: ClfdbScope, operation: ClfdbOperation) -> Result<()> {
        self.require_authenticated()?;
        perform_clfdb(&mut self.executor, scope, target_aid.to_vec(), operation)?;
        Ok(())
    }

    /// Re-associate `object_aid` under `target_sd_aid`.
    pub fn extradite(&mut self, object_aid: &[u8], target_sd_aid: &[u8]) -> Result<()> {
        self.require_authenticated()?;
        extradite(&mut self.executor, object_aid.to_vec(), target_sd_aid.to_vec())?;
        Ok(())
    }

    /// Read the card's GlobalPlatform Card Data object and reader/ATR
    /// metadata. Does not require a secure channel.
    pub fn card_info(&mut self) -> Result<CardInfo> {
        let card_data = get_card_data(&mut self.executor, CARD_DATA_TAG)?.to_vec();
        Ok(CardInfo {
            atr: self.atr().to_vec(),
            reader_name: self.reader_name().to_string(),
            isd_aid: self.isd_aid.clone(),
            card_data,
        })
    }

    /// Build and persist a CLFDB OTA envelope. Store-only: does not touch
    /// the connected card.
    pub fn build_ota_clfdb(
        &self,
        target_aid: &[u8],
        operation: OtaClfdbOperation,
        template_name: &str,
        keyset_name: &str,
        value_set: &str,
    ) -> Result<OtaMessage> {
        Ok(self
            .ota
            .build_clfdb(target_aid, operation, template_name, keyset_name, value_set)?)
    }

    /// Build and persist an OTA envelope around a caller-supplied APDU.
    /// Store-only: does not touch the connected card.
    pub fn build_ota_custom(
        &self,
        target_aid: &[u8],
        operation_tag: &str,
        command: &[u8],
        template_name: &str,
        keyset_name: &str,
        value_set: &str,
    ) -> Result<OtaMessage> {
        Ok(self.ota.build_custom(
            target_aid,
            operation_tag,
            command,
            template_name,
            keyset_name,
            value_set,
        )?)
    }

    /// Borrow the underlying store (used by callers that want keyset,
    /// template or OTA message queries without a card connected).
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Close the session: drops the transport (disconnecting the reader)
    /// and, if a secure channel was open, its session keys with it.
    pub fn close(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_level_mapping() {
        assert_eq!(security_level_from(1), SecurityLevel::MAC);
        assert_eq!(security_level_from(2), SecurityLevel::MAC_ENC);
        assert_eq!(security_level_from(3), SecurityLevel::FULL);
    }
}
