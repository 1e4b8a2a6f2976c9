//! `list-readers`, `connect`, `disconnect`, `establish-secure-channel`,
//! `close-secure-channel`, `list-applications`, `list-security-domains`,
//! `card-info`, `status`, `create-security-domain`, `clfdb`, `extradite`:
//! everything that touches a connected card.

use cardmgr_globalplatform::{ClfdbOperation, ClfdbScope, Privileges};
use cardmgr_session::{Config, Session};
use cardmgr_store::Store;

use super::{parse_aid, AppError};
use crate::cli::{ClfdbOperationArg, ClfdbScopeArg, SdKindArg};
use crate::display;

/// Resolve which reader to connect through: the explicit `--reader`, or
/// the sole attached reader if exactly one is present.
fn resolve_reader(reader: Option<&str>) -> Result<String, AppError> {
    if let Some(name) = reader {
        return Ok(name.to_string());
    }
    let readers = Session::list_readers()?;
    match readers.as_slice() {
        [single] => Ok(single.clone()),
        [] => Err(AppError::Input("no PC/SC readers attached".to_string())),
        _ => Err(AppError::Input(format!(
            "multiple readers attached ({}); specify --reader",
            readers.join(", ")
        ))),
    }
}

fn open_session(reader: Option<&str>, config: &Config) -> Result<Session, AppError> {
    let reader_name = resolve_reader(reader)?;
    let store = Store::open(&config.store_path)?;
    Ok(Session::connect(&reader_name, store, config)?)
}

const fn clfdb_operation_from_arg(arg: ClfdbOperationArg) -> ClfdbOperation {
    match arg {
        ClfdbOperationArg::Lock => ClfdbOperation::Lock,
        ClfdbOperationArg::Unlock => ClfdbOperation::Unlock,
        ClfdbOperationArg::Terminate => ClfdbOperation::Terminate,
    }
}

const fn clfdb_scope_from_arg(arg: ClfdbScopeArg) -> ClfdbScope {
    match arg {
        ClfdbScopeArg::Card => ClfdbScope::Card,
        ClfdbScopeArg::Application => ClfdbScope::Application,
    }
}

const fn default_privileges_for(kind: SdKindArg) -> u8 {
    match kind {
        SdKindArg::Ssd | SdKindArg::Amsd => Privileges::SECURITY_DOMAIN,
        SdKindArg::Dmsd => Privileges::SECURITY_DOMAIN | Privileges::DELEGATED_MANAGEMENT,
    }
}

pub fn list_readers() -> Result<(), AppError> {
    let readers = Session::list_readers()?;
    println!("{}", display::section("Readers"));
    for reader in &readers {
        println!("  {reader}");
    }
    if readers.is_empty() {
        println!("  (none)");
    }
    Ok(())
}

pub fn connect(reader: Option<&str>, config: &Config) -> Result<(), AppError> {
    let mut session = open_session(reader, config)?;
    let info = session.card_info()?;
    println!(
        "{}",
        display::key_value_block(
            "Connected",
            &[
                ("reader", info.reader_name.clone()),
                ("atr", display::hexdump(&info.atr)),
                ("isd_aid", display::hexdump(&info.isd_aid)),
            ],
        )
    );
    session.close();
    Ok(())
}

pub fn disconnect() -> Result<(), AppError> {
    println!(
        "{}",
        display::warning("each cardmgr invocation is a fresh process; there is no connection to tear down")
    );
    Ok(())
}

pub fn establish_secure_channel(
    reader: Option<&str>,
    config: &Config,
    keyset: &str,
    value_set: &str,
    security_level: Option<u8>,
) -> Result<(), AppError> {
    let mut session = open_session(reader, config)?;
    session.establish_secure_channel(keyset, value_set, security_level)?;
    println!("{}", display::success(&format!("secure channel established with keyset '{keyset}'")));
    session.close_secure_channel()?;
    session.close();
    Ok(())
}

pub fn close_secure_channel(reader: Option<&str>, config: &Config) -> Result<(), AppError> {
    let mut session = open_session(reader, config)?;
    session.close_secure_channel()?;
    println!("{}", display::success("secure channel closed"));
    session.close();
    Ok(())
}

pub fn list_applications(
    reader: Option<&str>,
    config: &Config,
    keyset: &str,
    value_set: &str,
    security_level: Option<u8>,
) -> Result<(), AppError> {
    let mut session = open_session(reader, config)?;
    session.establish_secure_channel(keyset, value_set, security_level)?;
    let apps = session.list_applications()?;

    println!("{}", display::section("Applications"));
    for app in &apps {
        println!(
            "  {:<34} lifecycle={:?} privileges=0x{:02X}",
            display::hexdump(&app.aid),
            app.life_cycle,
            app.privileges.0
        );
    }
    if apps.is_empty() {
        println!("  (none)");
    }
    session.close();
    Ok(())
}

pub fn list_security_domains(
    reader: Option<&str>,
    config: &Config,
    keyset: &str,
    value_set: &str,
    security_level: Option<u8>,
) -> Result<(), AppError> {
    let mut session = open_session(reader, config)?;
    session.establish_secure_channel(keyset, value_set, security_level)?;
    let domains = session.list_security_domains()?;

    println!("{}", display::section("Security domains"));
    for domain in &domains {
        println!(
            "  {:<34} kind={:?} lifecycle={:?} privileges=0x{:02X}",
            display::hexdump(&domain.aid),
            domain.kind,
            domain.life_cycle,
            domain.privileges.0
        );
    }
    if domains.is_empty() {
        println!("  (none)");
    }
    session.close();
    Ok(())
}

pub fn card_info(reader: Option<&str>, config: &Config) -> Result<(), AppError> {
    let mut session = open_session(reader, config)?;
    let info = session.card_info()?;
    println!(
        "{}",
        display::key_value_block(
            "Card info",
            &[
                ("reader", info.reader_name.clone()),
                ("atr", display::hexdump(&info.atr)),
                ("isd_aid", display::hexdump(&info.isd_aid)),
                ("card_data", display::hexdump(&info.card_data)),
            ],
        )
    );
    session.close();
    Ok(())
}

pub fn status(reader: Option<&str>, config: &Config, keyset: Option<&str>, value_set: &str) -> Result<(), AppError> {
    let mut session = open_session(reader, config)?;
    let info = session.card_info()?;
    let mut items = vec![
        ("reader", info.reader_name.clone()),
        ("atr", display::hexdump(&info.atr)),
        ("isd_aid", display::hexdump(&info.isd_aid)),
    ];

    if let Some(keyset) = keyset {
        match session.establish_secure_channel(keyset, value_set, None) {
            Ok(()) => items.push(("secure_channel", format!("established with '{keyset}'"))),
            Err(error) => items.push(("secure_channel", format!("failed: {error}"))),
        }
    } else {
        items.push(("secure_channel", "not attempted".to_string()));
    }

    println!("{}", display::key_value_block("Status", &items));
    session.close();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn create_security_domain(
    reader: Option<&str>,
    config: &Config,
    aid_hex: &str,
    kind: SdKindArg,
    privileges_hex: Option<&str>,
    keyset: &str,
    value_set: &str,
    security_level: Option<u8>,
) -> Result<(), AppError> {
    let aid = parse_aid(aid_hex)?;
    let privileges = match privileges_hex {
        Some(hex_str) => {
            let bytes = hex::decode(hex_str)?;
            *bytes
                .first()
                .ok_or_else(|| AppError::Input("--privileges must be exactly one byte".to_string()))?
        }
        None => default_privileges_for(kind),
    };

    let mut session = open_session(reader, config)?;
    session.establish_secure_channel(keyset, value_set, security_level)?;
    session.create_sd(&aid, privileges)?;
    println!("{}", display::success(&format!("security domain {} created", display::hexdump(&aid))));
    session.close();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn clfdb(
    reader: Option<&str>,
    config: &Config,
    aid_hex: &str,
    operation: ClfdbOperationArg,
    scope: ClfdbScopeArg,
    keyset: &str,
    value_set: &str,
    security_level: Option<u8>,
) -> Result<(), AppError> {
    let aid = parse_aid(aid_hex)?;
    let mut session = open_session(reader, config)?;
    session.establish_secure_channel(keyset, value_set, security_level)?;
    session.clfdb(&aid, clfdb_scope_from_arg(scope), clfdb_operation_from_arg(operation))?;
    println!("{}", display::success(&format!("clfdb {operation:?} applied to {}", display::hexdump(&aid))));
    session.close();
    Ok(())
}

pub fn extradite(
    reader: Option<&str>,
    config: &Config,
    object_aid_hex: &str,
    target_sd_aid_hex: &str,
    keyset: &str,
    value_set: &str,
    security_level: Option<u8>,
) -> Result<(), AppError> {
    let object_aid = parse_aid(object_aid_hex)?;
    let target_sd_aid = parse_aid(target_sd_aid_hex)?;
    let mut session = open_session(reader, config)?;
    session.establish_secure_channel(keyset, value_set, security_level)?;
    session.extradite(&object_aid, &target_sd_aid)?;
    println!(
        "{}",
        display::success(&format!(
            "{} extradited under {}",
            display::hexdump(&object_aid),
            display::hexdump(&target_sd_aid)
        ))
    );
    session.close();
    Ok(())
}
