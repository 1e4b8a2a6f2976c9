//! `list-keysets`, `add-keyset`, `delete-keyset`, `export-keysets`,
//! `import-keysets`, `list-value-sets`: pure store operations, no card I/O.

use std::path::Path;

use cardmgr_session::Config;
use cardmgr_store::{KeysetFilter, NewKeyset, Protocol, Store};

use super::AppError;
use crate::cli::ProtocolArg;
use crate::display;

fn open_store(config: &Config) -> Result<Store, AppError> {
    Ok(Store::open(&config.store_path)?)
}

const fn protocol_from_arg(arg: ProtocolArg) -> Protocol {
    match arg {
        ProtocolArg::Scp02 => Protocol::Scp02,
        ProtocolArg::Scp03 => Protocol::Scp03,
    }
}

pub fn list_keysets(
    config: &Config,
    value_set: Option<&str>,
    protocol: Option<ProtocolArg>,
    include_inactive: bool,
) -> Result<(), AppError> {
    let store = open_store(config)?;
    let filter = KeysetFilter {
        value_set: value_set.map(str::to_string),
        protocol: protocol.map(protocol_from_arg),
        include_inactive,
    };
    let keysets = store.list_keysets(&filter)?;

    println!("{}", display::section("Keysets"));
    for keyset in &keysets {
        println!(
            "  {:<20} value_set={:<12} protocol={:<6} kvn={:<3} level={} active={}",
            keyset.name, keyset.value_set, keyset.protocol, keyset.key_version, keyset.security_level, keyset.active
        );
    }
    if keysets.is_empty() {
        println!("  (none)");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn add_keyset(
    config: &Config,
    name: &str,
    value_set: &str,
    protocol: ProtocolArg,
    enc_key_hex: &str,
    mac_key_hex: &str,
    dek_key_hex: &str,
    key_version: u8,
    security_level: u8,
    description: Option<String>,
) -> Result<(), AppError> {
    let store = open_store(config)?;
    let keyset = store.add_keyset(NewKeyset {
        name: name.to_string(),
        value_set: value_set.to_string(),
        protocol: protocol_from_arg(protocol),
        enc: hex::decode(enc_key_hex)?,
        mac: hex::decode(mac_key_hex)?,
        dek: hex::decode(dek_key_hex)?,
        key_version,
        security_level,
        description,
    })?;
    println!(
        "{}",
        display::success(&format!("keyset '{}' added to value set '{}'", keyset.name, keyset.value_set))
    );
    Ok(())
}

pub fn delete_keyset(config: &Config, name: &str, value_set: &str) -> Result<(), AppError> {
    let store = open_store(config)?;
    store.delete_keyset(name, value_set)?;
    println!("{}", display::success(&format!("keyset '{name}' soft-deleted from value set '{value_set}'")));
    Ok(())
}

pub fn export_keysets(config: &Config, value_set: &str, file: &Path) -> Result<(), AppError> {
    let store = open_store(config)?;
    let count = store.export_keysets_yaml(value_set, file)?;
    println!("{}", display::success(&format!("exported {count} keyset(s) from '{value_set}' to {}", file.display())));
    Ok(())
}

pub fn import_keysets(config: &Config, file: &Path, value_set: &str) -> Result<(), AppError> {
    let store = open_store(config)?;
    let (imported, skipped) = store.import_keysets_yaml(file, value_set)?;
    println!(
        "{}",
        display::success(&format!("imported {imported} keyset(s) into '{value_set}', skipped {skipped}"))
    );
    Ok(())
}

pub fn list_value_sets(config: &Config) -> Result<(), AppError> {
    let store = open_store(config)?;
    let value_sets = store.list_value_sets()?;
    println!("{}", display::section("Value sets"));
    for value_set in &value_sets {
        println!("  {value_set}");
    }
    Ok(())
}
