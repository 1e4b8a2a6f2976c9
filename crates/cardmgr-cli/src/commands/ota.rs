//! `ota-clfdb`, `ota-custom`, `ota-list`, `ota-templates`: OTA envelope
//! construction and message/template history. Store-only, no card I/O
//! (spec.md §4.7).

use cardmgr_ota::{OtaBuilder, OtaClfdbOperation};
use cardmgr_session::Config;
use cardmgr_store::{OtaMessageFilter, OtaMessageStatus, Store};

use super::{parse_aid, AppError};
use crate::cli::{OtaOperationArg, OtaStatusArg};
use crate::display;

fn open_store(config: &Config) -> Result<Store, AppError> {
    Ok(Store::open(&config.store_path)?)
}

const fn operation_from_arg(arg: OtaOperationArg) -> OtaClfdbOperation {
    match arg {
        OtaOperationArg::Lock => OtaClfdbOperation::Lock,
        OtaOperationArg::Unlock => OtaClfdbOperation::Unlock,
        OtaOperationArg::Terminate => OtaClfdbOperation::Terminate,
        OtaOperationArg::MakeSelectable => OtaClfdbOperation::MakeSelectable,
    }
}

const fn status_from_arg(arg: OtaStatusArg) -> OtaMessageStatus {
    match arg {
        OtaStatusArg::Pending => OtaMessageStatus::Pending,
        OtaStatusArg::Sent => OtaMessageStatus::Sent,
        OtaStatusArg::Delivered => OtaMessageStatus::Delivered,
        OtaStatusArg::Failed => OtaMessageStatus::Failed,
    }
}

pub fn ota_clfdb(
    config: &Config,
    aid_hex: &str,
    operation: OtaOperationArg,
    template: &str,
    keyset: &str,
    value_set: &str,
) -> Result<(), AppError> {
    let aid = parse_aid(aid_hex)?;
    let store = open_store(config)?;
    let builder = OtaBuilder::new(store);
    let message = builder.build_clfdb(&aid, operation_from_arg(operation), template, keyset, value_set)?;

    println!(
        "{}",
        display::key_value_block(
            "OTA message built",
            &[
                ("id", message.id.to_string()),
                ("operation", message.operation.clone()),
                ("target_aid", display::hexdump(&message.target_aid)),
                ("sms_tpdu", display::hexdump(&message.sms_tpdu)),
            ],
        )
    );
    Ok(())
}

pub fn ota_custom(
    config: &Config,
    aid_hex: &str,
    apdu_hex: &str,
    template: &str,
    keyset: &str,
    value_set: &str,
) -> Result<(), AppError> {
    let aid = parse_aid(aid_hex)?;
    let command = hex::decode(apdu_hex)?;
    let store = open_store(config)?;
    let builder = OtaBuilder::new(store);
    let message = builder.build_custom(&aid, "CUSTOM", &command, template, keyset, value_set)?;

    println!(
        "{}",
        display::key_value_block(
            "OTA message built",
            &[
                ("id", message.id.to_string()),
                ("target_aid", display::hexdump(&message.target_aid)),
                ("sms_tpdu", display::hexdump(&message.sms_tpdu)),
            ],
        )
    );
    Ok(())
}

pub fn ota_list(config: &Config, status: Option<OtaStatusArg>, target_aid_hex: Option<&str>) -> Result<(), AppError> {
    let store = open_store(config)?;
    let target_aid = target_aid_hex.map(hex::decode).transpose()?;
    let filter = OtaMessageFilter {
        status: status.map(status_from_arg),
        target_aid,
    };
    let messages = store.list_messages(&filter)?;

    println!("{}", display::section("OTA messages"));
    for message in &messages {
        println!(
            "  #{:<5} {:<16} target={} status={} created={}",
            message.id,
            message.operation,
            display::hexdump(&message.target_aid),
            message.status,
            message.created_at
        );
    }
    if messages.is_empty() {
        println!("  (none)");
    }
    Ok(())
}

pub fn ota_templates(config: &Config, template_type: Option<&str>) -> Result<(), AppError> {
    let store = open_store(config)?;
    let templates = store.list_templates(template_type)?;

    println!("{}", display::section("OTA templates"));
    for template in &templates {
        println!(
            "  {:<16} type={:<8} spi={} kic={:02X} kid={:02X} tar={} counter={}",
            template.name,
            template.template_type,
            display::hexdump(&template.spi),
            template.kic,
            template.kid,
            display::hexdump(&template.tar),
            template.counter
        );
    }
    if templates.is_empty() {
        println!("  (none)");
    }
    Ok(())
}
