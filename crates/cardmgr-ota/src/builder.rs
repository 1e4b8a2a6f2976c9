//! OTA envelope construction (spec.md §4.7): renders a template, assembles
//! the secured packet and SMS-DELIVER TPDU, advances the template's
//! counter, and persists the result as a `PENDING` [`OtaMessage`].

use cardmgr_store::{parameters_from_pairs, NewOtaMessage, OtaMessage, Store};
use tracing::debug;

use crate::error::{Error, Result};
use crate::operation::OtaClfdbOperation;
use crate::security_packet;
use crate::template::{self, Values};
use crate::{tpdu, udh};

const MIN_AID_LEN: usize = 5;
const MAX_AID_LEN: usize = 16;

fn validate_aid(aid: &[u8]) -> Result<()> {
    if (MIN_AID_LEN..=MAX_AID_LEN).contains(&aid.len()) {
        Ok(())
    } else {
        Err(Error::InvalidAidLength(aid.len()))
    }
}

/// Builds OTA envelopes against a [`Store`] handle, reading templates and
/// keysets and recording every generated message.
#[derive(Debug, Clone)]
pub struct OtaBuilder {
    store: Store,
}

impl OtaBuilder {
    /// Build against `store`.
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Build a CLFDB (lock/unlock/terminate/make-selectable) OTA command
    /// against `target_aid`, using `template_name`'s header fields and
    /// `keyset_name`/`value_set`'s keys, and persist the result.
    pub fn build_clfdb(
        &self,
        target_aid: &[u8],
        operation: OtaClfdbOperation,
        template_name: &str,
        keyset_name: &str,
        value_set: &str,
    ) -> Result<OtaMessage> {
        validate_aid(target_aid)?;

        let ota_template = self.store.get_template(template_name)?;
        let keyset = self.store.get_keyset(keyset_name, value_set)?;
        let counter = self.store.increment_template_counter(template_name)?;

        let mut values = Values::new();
        values.insert("lifecycle", hex::encode_upper([operation.life_cycle_byte()]));
        values.insert("aid_length", hex::encode_upper([target_aid.len() as u8]));
        values.insert("aid", hex::encode_upper(target_aid));
        values.insert("counter", hex::encode_upper(counter.to_be_bytes()[1..].to_vec()));
        values.insert("spi", hex::encode_upper(ota_template.spi));
        values.insert("tar", hex::encode_upper(ota_template.tar));

        let command = template::render(&ota_template.template, &values)?;

        let secured = security_packet::build(
            &ota_template,
            keyset.protocol,
            &keyset.enc,
            &keyset.mac,
            counter,
            &command,
        )?;

        let udh_bytes = udh::build(secured.len());
        let sms_tpdu = tpdu::build(&udh_bytes, &secured);

        debug!(
            operation = %operation,
            template = template_name,
            keyset = keyset_name,
            counter,
            "ota envelope built"
        );

        let parameters = parameters_from_pairs([
            ("lifecycle", serde_json::json!(format!("0x{:02X}", operation.life_cycle_byte()))),
            ("counter", serde_json::json!(counter)),
        ]);

        let message = self.store.add_message(NewOtaMessage {
            template_id: ota_template.id,
            target_aid: target_aid.to_vec(),
            operation: operation.as_str().to_string(),
            parameters,
            sms_tpdu,
            udh: udh_bytes,
            user_data: secured,
        })?;

        Ok(message)
    }

    /// Build an OTA command around a caller-supplied APDU rather than a
    /// rendered template (spec.md §4.7: "for custom commands the caller
    /// supplies the APDU bytes directly").
    pub fn build_custom(
        &self,
        target_aid: &[u8],
        operation_tag: &str,
        command: &[u8],
        template_name: &str,
        keyset_name: &str,
        value_set: &str,
    ) -> Result<OtaMessage> {
        validate_aid(target_aid)?;

        let ota_template = self.store.get_template(template_name)?;
        let keyset = self.store.get_keyset(keyset_name, value_set)?;
        let counter = self.store.increment_template_counter(template_name)?;

        let secured = security_packet::build(
            &ota_template,
            keyset.protocol,
            &keyset.enc,
            &keyset.mac,
            counter,
            command,
        )?;

        let udh_bytes = udh::build(secured.len());
        let sms_tpdu = tpdu::build(&udh_bytes, &secured);

        debug!(
            operation = operation_tag,
            template = template_name,
            keyset = keyset_name,
            counter,
            "custom ota envelope built"
        );

        let message = self.store.add_message(NewOtaMessage {
            template_id: ota_template.id,
            target_aid: target_aid.to_vec(),
            operation: operation_tag.to_string(),
            parameters: parameters_from_pairs([
                ("counter", serde_json::json!(counter)),
                ("raw_apdu", serde_json::json!(hex::encode_upper(command))),
            ]),
            sms_tpdu,
            udh: udh_bytes,
            user_data: secured,
        })?;

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardmgr_store::NewKeyset;
    use cardmgr_store::Protocol;
    use hex_literal::hex;

    fn store_with_fixtures() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .add_keyset(NewKeyset {
                name: "clfdb-key".to_string(),
                value_set: "test".to_string(),
                protocol: Protocol::Scp03,
                enc: vec![0u8; 16],
                mac: vec![0u8; 16],
                dek: vec![0u8; 16],
                key_version: 1,
                security_level: 1,
                description: None,
            })
            .unwrap();
        store
    }

    #[test]
    fn build_clfdb_produces_pending_message_with_fixed_header() {
        let store = store_with_fixtures();
        let builder = OtaBuilder::new(store.clone());
        let aid = hex!("A000000001510000").to_vec();

        let message = builder
            .build_clfdb(&aid, OtaClfdbOperation::Lock, "clfdb_lock", "clfdb-key", "test")
            .unwrap();

        assert_eq!(message.status, cardmgr_store::OtaMessageStatus::Pending);
        assert_eq!(message.target_aid, aid);
        assert_eq!(message.operation, "LOCK");
        assert_eq!(message.sms_tpdu[0], 0x44);
        assert_eq!(message.udh[0], 0x70);
    }

    #[test]
    fn successive_builds_advance_counter_by_one() {
        let store = store_with_fixtures();
        let builder = OtaBuilder::new(store.clone());
        let aid = hex!("A000000001510000").to_vec();

        builder
            .build_clfdb(&aid, OtaClfdbOperation::Lock, "clfdb_lock", "clfdb-key", "test")
            .unwrap();
        let before = store.get_template("clfdb_lock").unwrap().counter;
        builder
            .build_clfdb(&aid, OtaClfdbOperation::Lock, "clfdb_lock", "clfdb-key", "test")
            .unwrap();
        let after = store.get_template("clfdb_lock").unwrap().counter;

        assert_eq!(after, before + 1);
    }

    #[test]
    fn rejects_aid_outside_allowed_range() {
        let store = store_with_fixtures();
        let builder = OtaBuilder::new(store);
        let short_aid = vec![0xA0, 0x00, 0x00];

        let err = builder
            .build_clfdb(&short_aid, OtaClfdbOperation::Lock, "clfdb_lock", "clfdb-key", "test")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAidLength(3)));
    }

    #[test]
    fn build_custom_uses_caller_supplied_apdu_verbatim() {
        let store = store_with_fixtures();
        let builder = OtaBuilder::new(store);
        let aid = hex!("A000000001510000").to_vec();
        let apdu = hex!("00A4040000").to_vec();

        let message = builder
            .build_custom(&aid, "CUSTOM", &apdu, "clfdb_lock", "clfdb-key", "test")
            .unwrap();
        assert_eq!(message.operation, "CUSTOM");
    }
}
