//! Address domain model.
//!
//! # Responsibility
//! - Define the canonical Country/State/Address entities and their bounds.
//! - Enforce field-shape invariants before rows reach storage.
//! - Render the canonical display string for each entity.
//!
//! # Invariants
//! - `Address::raw` is the only mandatory address field and is never blank.
//! - A persisted `State` always belongs to exactly one `Country`.
//! - Entities loaded from storage are fully materialized: a state embeds
//!   its country, an address embeds its state.
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::model::input::AddressMapping;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned row key for countries.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type CountryId = i64;
/// Storage-assigned row key for states.
pub type StateId = i64;
/// Storage-assigned row key for addresses.
pub type AddressId = i64;

/// Upper bound (in chars) for `Country::name`.
pub const COUNTRY_NAME_MAX: usize = 50;
/// Upper bound (in chars) for `State::name`.
pub const STATE_NAME_MAX: usize = 100;
/// Upper bound (in chars) for country and state codes.
pub const CODE_MAX: usize = 3;
/// Upper bound (in chars) for `Address::raw`.
pub const RAW_MAX: usize = 200;
/// Upper bound (in chars) for `Address::street`.
pub const STREET_MAX: usize = 100;
/// Upper bound (in chars) for `Address::town_city`.
pub const TOWN_CITY_MAX: usize = 50;
/// Upper bound (in chars) for `Address::postal_code`.
pub const POSTAL_CODE_MAX: usize = 10;

/// Country record, the root of the entity graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: CountryId,
    /// Unique human-readable name, e.g. `Nigeria`.
    pub name: String,
    /// Short code, e.g. `NG`. May be empty, never longer than [`CODE_MAX`].
    pub code: String,
}

/// State (or province/region) record, always owned by one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub id: StateId,
    /// Name, unique per country but not globally.
    pub name: String,
    /// Short code, e.g. `LG`. May be empty.
    pub code: String,
    /// Owning country. `None` only for transient values; persisted rows
    /// always carry their country.
    pub country: Option<Country>,
}

/// Address record, the leaf of the entity graph.
///
/// `raw` is the only field every address carries; the structured fields
/// exist so repeat submissions of the same place collapse onto one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    /// Free-text address exactly as the caller submitted it.
    pub raw: String,
    /// Street line, empty when the caller submitted raw text only.
    pub street: String,
    /// Town or city name.
    pub town_city: String,
    /// Postal or ZIP code.
    pub postal_code: String,
    /// Resolved state, embedding its country when loaded from storage.
    pub state: Option<State>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Meters above sea level, captured alongside latitude/longitude.
    pub altitude: Option<f64>,
    /// GPS accuracy radius in meters. Never negative.
    pub gps_error: Option<u16>,
}

/// Field-shape failures detected before any SQL write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    BlankCountryName,
    CountryNameTooLong(usize),
    CountryCodeTooLong(usize),
    BlankStateName,
    StateNameTooLong(usize),
    StateCodeTooLong(usize),
    /// A state cannot be persisted without its owning country.
    MissingCountry,
    BlankRaw,
    RawTooLong(usize),
    StreetTooLong(usize),
    TownCityTooLong(usize),
    PostalCodeTooLong(usize),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankCountryName => write!(f, "country name must not be blank"),
            Self::CountryNameTooLong(len) => {
                write!(f, "country name exceeds {COUNTRY_NAME_MAX} chars: {len}")
            }
            Self::CountryCodeTooLong(len) => {
                write!(f, "country code exceeds {CODE_MAX} chars: {len}")
            }
            Self::BlankStateName => write!(f, "state name must not be blank"),
            Self::StateNameTooLong(len) => {
                write!(f, "state name exceeds {STATE_NAME_MAX} chars: {len}")
            }
            Self::StateCodeTooLong(len) => write!(f, "state code exceeds {CODE_MAX} chars: {len}"),
            Self::MissingCountry => write!(f, "state must reference an owning country"),
            Self::BlankRaw => write!(f, "address raw text must not be blank"),
            Self::RawTooLong(len) => write!(f, "address raw text exceeds {RAW_MAX} chars: {len}"),
            Self::StreetTooLong(len) => write!(f, "street exceeds {STREET_MAX} chars: {len}"),
            Self::TownCityTooLong(len) => {
                write!(f, "town/city exceeds {TOWN_CITY_MAX} chars: {len}")
            }
            Self::PostalCodeTooLong(len) => {
                write!(f, "postal code exceeds {POSTAL_CODE_MAX} chars: {len}")
            }
        }
    }
}

impl Error for ValidationError {}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

impl Country {
    /// Field-shape checks shared by create and update paths.
    pub fn validate_fields(name: &str, code: &str) -> Result<(), ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::BlankCountryName);
        }
        let name_len = char_len(name);
        if name_len > COUNTRY_NAME_MAX {
            return Err(ValidationError::CountryNameTooLong(name_len));
        }
        let code_len = char_len(code);
        if code_len > CODE_MAX {
            return Err(ValidationError::CountryCodeTooLong(code_len));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        Self::validate_fields(&self.name, &self.code)
    }
}

impl State {
    /// Field-shape checks shared by create and update paths.
    ///
    /// `has_country` is checked here rather than at the SQL layer, so a
    /// detached state fails before any write is attempted.
    pub fn validate_fields(
        name: &str,
        code: &str,
        has_country: bool,
    ) -> Result<(), ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::BlankStateName);
        }
        let name_len = char_len(name);
        if name_len > STATE_NAME_MAX {
            return Err(ValidationError::StateNameTooLong(name_len));
        }
        let code_len = char_len(code);
        if code_len > CODE_MAX {
            return Err(ValidationError::StateCodeTooLong(code_len));
        }
        if !has_country {
            return Err(ValidationError::MissingCountry);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        Self::validate_fields(&self.name, &self.code, self.country.is_some())
    }
}

impl Address {
    /// Field-shape checks shared by create and update paths.
    pub fn validate_fields(
        raw: &str,
        street: &str,
        town_city: &str,
        postal_code: &str,
    ) -> Result<(), ValidationError> {
        if raw.is_empty() {
            return Err(ValidationError::BlankRaw);
        }
        let raw_len = char_len(raw);
        if raw_len > RAW_MAX {
            return Err(ValidationError::RawTooLong(raw_len));
        }
        let street_len = char_len(street);
        if street_len > STREET_MAX {
            return Err(ValidationError::StreetTooLong(street_len));
        }
        let town_city_len = char_len(town_city);
        if town_city_len > TOWN_CITY_MAX {
            return Err(ValidationError::TownCityTooLong(town_city_len));
        }
        let postal_code_len = char_len(postal_code);
        if postal_code_len > POSTAL_CODE_MAX {
            return Err(ValidationError::PostalCodeTooLong(postal_code_len));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        Self::validate_fields(&self.raw, &self.street, &self.town_city, &self.postal_code)
    }

    /// Flattens this address into the canonical wire mapping.
    ///
    /// `state`, `state_code` and `postal_code` ride along only when a state
    /// is attached; `country`/`country_code` further require the state to
    /// carry its country. Numeric fields are always present and `None` when
    /// not captured.
    pub fn as_mapping(&self) -> AddressMapping {
        let mut mapping = AddressMapping {
            raw: self.raw.clone(),
            street: self.street.clone(),
            town_city: self.town_city.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
            gps_error: self.gps_error,
            ..AddressMapping::default()
        };
        if let Some(state) = &self.state {
            mapping.state = Some(state.name.clone());
            mapping.state_code = Some(state.code.clone());
            mapping.postal_code = Some(self.postal_code.clone());
            if let Some(country) = &state.country {
                mapping.country = Some(country.name.clone());
                mapping.country_code = Some(country.code.clone());
            }
        }
        mapping
    }
}

impl Display for Country {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.country {
            Some(country) if !self.name.is_empty() => {
                write!(f, "{}, {}", self.name, country.name)
            }
            Some(country) => write!(f, "{}", country.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Display for Address {
    /// Structured rendering when a state is attached, `raw` otherwise.
    ///
    /// The postal code is printed only inside the town/city block, matching
    /// the `street, town_city postal_code, state, country` convention.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Some(state) = &self.state else {
            return write!(f, "{}", self.raw);
        };
        let mut value = String::new();
        if !self.street.is_empty() {
            value.push_str(&self.street);
        }
        if !self.town_city.is_empty() {
            if !value.is_empty() {
                value.push_str(", ");
            }
            value.push_str(&self.town_city);
            if !self.postal_code.is_empty() {
                value.push(' ');
                value.push_str(&self.postal_code);
            }
        }
        if !value.is_empty() {
            value.push_str(", ");
        }
        write!(f, "{value}{state}")
    }
}
