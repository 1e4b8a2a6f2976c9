//! GlobalPlatform command layer: SELECT, GET STATUS (paged), INSTALL
//! (Security Domain creation), SET STATUS (CLFDB life-cycle changes and
//! extradition), and GET DATA.
//!
//! Commands are hand-written [`cardmgr_apdu_core::ApduCommand`] structs
//! rather than generated through a procedural macro, so that each command's
//! data-field layout is explicit and directly traceable to the card
//! specification it implements. Every command goes through whatever
//! [`cardmgr_apdu_core::Executor`] the caller supplies — a plain
//! [`cardmgr_apdu_core::CardExecutor`] if no secure channel is open, or one
//! with a secure channel processor installed.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod commands;
pub mod constants;
pub mod descriptor;
pub mod error;

pub use commands::{
    create_security_domain, extradite, get_card_data, get_status, perform_clfdb,
    select_card_manager, Clfdb, ClfdbOperation, ClfdbScope, CreateSecurityDomain, Extradite,
    GetData, GetDataResponse, GetStatus, GetStatusResponse, Select, SelectResponse,
    SetStatusResponse, StatusScope,
};
pub use descriptor::{
    ApplicationDescriptor, LifeCycleState, Privileges, SecurityDomainDescriptor,
    SecurityDomainKind, StatusEntry,
};
pub use error::{Error, Result};
