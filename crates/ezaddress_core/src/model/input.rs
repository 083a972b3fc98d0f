//! Input shapes accepted by the address normalizer.
//!
//! # Responsibility
//! - Define the structured field mapping used on the wire and in forms.
//! - Define the tagged input enum dispatched by the service.
//!
//! # Invariants
//! - Serialized mappings omit `state`/`state_code`/`postal_code` unless a
//!   state is attached, and `country`/`country_code` unless the state has
//!   a country; `Address::as_mapping` is the producing side of that rule.
//! - Absent optional text is `None`, never an empty string.
//!
//! # See also
//! - docs/architecture/normalization.md

use crate::model::address::{Address, AddressId};
use serde::{Deserialize, Serialize};

/// Structured address fields, both the submission and the wire shape.
///
/// Serialization keeps `raw`, `street`, `town_city` and the four numeric
/// fields on every payload (`null` when missing) and drops the state- and
/// country-scoped keys when the corresponding entity is not attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressMapping {
    /// Free-text fallback; the only mandatory address field.
    #[serde(default)]
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub town_city: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub gps_error: Option<u16>,
}

/// Tagged input accepted by the normalization entry points.
///
/// Callers holding loose JSON go through
/// [`crate::form::address_input_from_value`]; typed callers construct
/// cases directly or lean on the `From` conversions.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressInput {
    /// Bare free-text address. Always stored as a fresh raw-only row.
    Text(String),
    /// Key of a pre-existing address row, passed through undereferenced.
    Key(AddressId),
    /// Already-materialized record, passed through unchanged.
    Record(Address),
    /// Structured field mapping, the deduplicating path.
    Mapping(AddressMapping),
}

impl AddressInput {
    /// Convenience constructor for the free-text case.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl From<&str> for AddressInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AddressInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<AddressId> for AddressInput {
    fn from(value: AddressId) -> Self {
        Self::Key(value)
    }
}

impl From<Address> for AddressInput {
    fn from(value: Address) -> Self {
        Self::Record(value)
    }
}

impl From<AddressMapping> for AddressInput {
    fn from(value: AddressMapping) -> Self {
        Self::Mapping(value)
    }
}
