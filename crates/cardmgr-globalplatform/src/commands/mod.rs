//! Typed GlobalPlatform commands (spec.md §4.5).

pub mod get_data;
pub mod get_status;
pub mod install;
pub mod select;
pub mod set_status;

pub use get_data::{get_card_data, GetData, GetDataResponse};
pub use get_status::{get_status, GetStatus, GetStatusResponse, StatusScope};
pub use install::{create_security_domain, CreateSecurityDomain, InstallResponse};
pub use select::{select_card_manager, Select, SelectResponse};
pub use set_status::{
    extradite, perform_clfdb, Clfdb, ClfdbOperation, ClfdbScope, Extradite, SetStatusResponse,
};
