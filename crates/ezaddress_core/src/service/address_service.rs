//! Address normalization service.
//!
//! # Responsibility
//! - Resolve heterogeneous caller input into canonical address rows.
//! - Find-or-create countries and states referenced by structured input.
//! - Apply the shared code-length rule for country and state codes.
//!
//! # Invariants
//! - Bare text input always inserts a fresh raw-only row, never dedups.
//! - A mapping naming exactly one of country/state is downgraded to a
//!   raw-only insert; the caller is not told.
//! - Key and record inputs pass through without touching storage.
//!
//! # See also
//! - docs/architecture/normalization.md

use crate::model::address::{Address, AddressId, Country, State, CODE_MAX};
use crate::model::input::{AddressInput, AddressMapping};
use crate::repo::address_repo::{
    AddressRepository, CountryRepository, NewAddress, RepoError, StateRepository,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, AddressServiceError>;

/// Service error for address normalization use-cases.
#[derive(Debug)]
pub enum AddressServiceError {
    /// Input is not one of the accepted address shapes.
    InvalidValue,
    /// A numeric field failed coercion.
    InvalidField { field: &'static str, value: String },
    /// Country code exceeds the length bound and is not the name itself.
    InvalidCountryCode(String),
    /// State code exceeds the length bound and is not the name itself.
    InvalidStateCode(String),
    /// Persistence-layer failure, including uniqueness violations.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for AddressServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue => write!(f, "Invalid address value."),
            Self::InvalidField { field, value } => {
                write!(f, "Invalid value for {field}: `{value}`")
            }
            Self::InvalidCountryCode(code) => write!(f, "Invalid country code (too long): {code}"),
            Self::InvalidStateCode(code) => write!(f, "Invalid state code (too long): {code}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent address state: {details}"),
        }
    }
}

impl Error for AddressServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AddressServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Outcome of address resolution.
///
/// Key inputs resolve without a storage round-trip, so the service cannot
/// hand back a record for them; everything else carries the full row.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedAddress {
    /// Fully materialized canonical row.
    Record(Address),
    /// Pre-existing row key passed through undereferenced.
    Key(AddressId),
}

impl ResolvedAddress {
    /// Storage key of the resolved row.
    pub fn id(&self) -> AddressId {
        match self {
            Self::Record(address) => address.id,
            Self::Key(id) => *id,
        }
    }

    /// Materialized record, when this resolution carries one.
    pub fn into_record(self) -> Option<Address> {
        match self {
            Self::Record(address) => Some(address),
            Self::Key(_) => None,
        }
    }
}

/// Mapping-path failure split.
///
/// The country/state presence mismatch never escapes `to_address`; it is
/// downgraded to a raw-only insert there. Everything else propagates.
enum MappingFailure {
    InconsistentPair,
    Service(AddressServiceError),
}

impl From<AddressServiceError> for MappingFailure {
    fn from(value: AddressServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<RepoError> for MappingFailure {
    fn from(value: RepoError) -> Self {
        Self::Service(AddressServiceError::Repo(value))
    }
}

/// Address normalization facade over the entity repositories.
pub struct AddressService<R> {
    repo: R,
}

impl<R> AddressService<R>
where
    R: CountryRepository + StateRepository + AddressRepository,
{
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Resolves one input value into a canonical address.
    ///
    /// - `None` and empty text resolve to `Ok(None)`.
    /// - Text inserts a fresh raw-only row on every call.
    /// - Keys and records pass through untouched.
    /// - Mappings resolve country and state, then find-or-create the
    ///   address row; see `normalization.md` for the dedup key rules.
    pub fn to_address(
        &self,
        value: Option<AddressInput>,
    ) -> ServiceResult<Option<ResolvedAddress>> {
        let Some(input) = value else {
            return Ok(None);
        };

        match input {
            AddressInput::Record(address) => Ok(Some(ResolvedAddress::Record(address))),
            AddressInput::Key(id) => Ok(Some(ResolvedAddress::Key(id))),
            AddressInput::Text(raw) => {
                if raw.is_empty() {
                    return Ok(None);
                }
                Ok(Some(ResolvedAddress::Record(self.create_raw_only(&raw)?)))
            }
            AddressInput::Mapping(mapping) => match self.normalize_mapping(&mapping) {
                Ok(address) => Ok(address.map(ResolvedAddress::Record)),
                Err(MappingFailure::InconsistentPair) => {
                    // Structured fields (GPS included) are dropped wholesale.
                    Ok(Some(ResolvedAddress::Record(
                        self.create_raw_only(&mapping.raw)?,
                    )))
                }
                Err(MappingFailure::Service(err)) => Err(err),
            },
        }
    }

    /// Assignment entry point for address-valued attributes on host
    /// records: resolves the input and returns the key to store.
    pub fn assign_address(&self, value: Option<AddressInput>) -> ServiceResult<Option<AddressId>> {
        Ok(self.to_address(value)?.map(|resolved| resolved.id()))
    }

    /// Finds a country by exact name or creates it.
    ///
    /// Empty names resolve to `Ok(None)`. The code of an existing row wins
    /// over whatever code the caller submitted.
    pub fn resolve_country(&self, name: &str, code: &str) -> ServiceResult<Option<Country>> {
        if name.is_empty() {
            return Ok(None);
        }
        if let Some(existing) = self.repo.find_country_by_name(name)? {
            return Ok(Some(existing));
        }

        let code =
            normalize_entity_code(name, code).map_err(AddressServiceError::InvalidCountryCode)?;
        Ok(Some(self.repo.create_country(name, code)?))
    }

    /// Finds a state by name or creates it under `country`.
    ///
    /// The lookup is by name alone, not scoped to the country, so a
    /// same-named state under another country is returned as-is.
    pub fn resolve_state(
        &self,
        name: &str,
        code: &str,
        country: Option<&Country>,
    ) -> ServiceResult<Option<State>> {
        if name.is_empty() {
            return Ok(None);
        }
        if let Some(existing) = self.repo.find_state_by_name(name)? {
            return Ok(Some(existing));
        }

        let code =
            normalize_entity_code(name, code).map_err(AddressServiceError::InvalidStateCode)?;
        Ok(Some(self.repo.create_state(name, code, country)?))
    }

    fn normalize_mapping(
        &self,
        mapping: &AddressMapping,
    ) -> Result<Option<Address>, MappingFailure> {
        if mapping.raw.is_empty() {
            return Ok(None);
        }

        let country_name = mapping.country.as_deref().unwrap_or_default();
        let state_name = mapping.state.as_deref().unwrap_or_default();
        // Country and state come together or not at all.
        if country_name.is_empty() != state_name.is_empty() {
            return Err(MappingFailure::InconsistentPair);
        }

        let country_code = mapping.country_code.as_deref().unwrap_or_default();
        let state_code = mapping.state_code.as_deref().unwrap_or_default();
        let postal_code = mapping.postal_code.as_deref().unwrap_or_default();

        let country = self.resolve_country(country_name, country_code)?;
        let state = self.resolve_state(state_name, state_code, country.as_ref())?;
        let state_id = state.as_ref().map(|state| state.id);

        let existing = if mapping.street.is_empty() && mapping.town_city.is_empty() {
            self.repo.find_address_by_raw(&mapping.raw)?
        } else {
            // Dedup on components; the incoming raw is not part of the key.
            self.repo.find_address_by_fields(
                &mapping.street,
                &mapping.town_city,
                postal_code,
                state_id,
            )?
        };
        if let Some(address) = existing {
            // Stored row wins; incoming field values are discarded.
            return Ok(Some(address));
        }

        let id = self.repo.create_address(&NewAddress {
            raw: mapping.raw.clone(),
            street: mapping.street.clone(),
            town_city: mapping.town_city.clone(),
            postal_code: postal_code.to_string(),
            state_id,
            latitude: mapping.latitude,
            longitude: mapping.longitude,
            altitude: mapping.altitude,
            gps_error: mapping.gps_error,
        })?;
        Ok(Some(self.read_back(id)?))
    }

    fn create_raw_only(&self, raw: &str) -> ServiceResult<Address> {
        let id = self.repo.create_address(&NewAddress::raw_only(raw))?;
        self.read_back(id)
    }

    fn read_back(&self, id: AddressId) -> ServiceResult<Address> {
        self.repo
            .get_address(id)?
            .ok_or(AddressServiceError::InconsistentState(
                "created address not found in read-back",
            ))
    }
}

/// Applies the shared code-length rule for country and state codes.
///
/// Codes within the bound pass through. A too-long code fails, unless the
/// caller redundantly passed the name as the code, which is treated as no
/// code at all.
fn normalize_entity_code<'a>(name: &str, code: &'a str) -> Result<&'a str, String> {
    if code.chars().count() <= CODE_MAX {
        return Ok(code);
    }
    if code == name {
        return Ok("");
    }
    Err(code.to_string())
}
