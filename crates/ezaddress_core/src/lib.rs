//! Core domain logic for ezaddress.
//! This crate is the single source of truth for address normalization
//! invariants.

pub mod db;
pub mod form;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use form::{address_input_from_value, clean_address, coerce_form_fields};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::address::{Address, AddressId, Country, CountryId, State, StateId, ValidationError};
pub use model::input::{AddressInput, AddressMapping};
pub use repo::address_repo::{
    AddressRepository, CountryRepository, NewAddress, RepoError, RepoResult,
    SqliteAddressRepository, StateRepository,
};
pub use service::address_service::{
    AddressService, AddressServiceError, ResolvedAddress, ServiceResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
