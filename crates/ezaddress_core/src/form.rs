//! Form-input coercion and shape dispatch for address values.
//!
//! # Responsibility
//! - Coerce string-typed form fields into the structured mapping.
//! - Dispatch loose JSON values onto the accepted input shapes.
//! - Surface per-field coercion failures for user-facing validation.
//!
//! # Invariants
//! - A numeric field submitted empty coerces to absent, never to zero.
//! - Unrecognized keys are ignored, never errors.
//! - Shape rejection is an error value, never a panic.
//!
//! # See also
//! - docs/architecture/normalization.md

use crate::model::input::{AddressInput, AddressMapping};
use crate::repo::address_repo::{AddressRepository, CountryRepository, StateRepository};
use crate::service::address_service::{AddressService, AddressServiceError, ResolvedAddress};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Coerces raw form fields (all strings) into the structured mapping.
///
/// Text fields copy through as submitted. `latitude`, `longitude` and
/// `altitude` must parse as floats, `gps_error` as a non-negative integer;
/// an empty submission for any of them means "not captured".
pub fn coerce_form_fields(
    fields: &BTreeMap<String, String>,
) -> Result<AddressMapping, AddressServiceError> {
    let mut mapping = AddressMapping::default();
    for (key, value) in fields {
        match key.as_str() {
            "raw" => mapping.raw = value.clone(),
            "street" => mapping.street = value.clone(),
            "town_city" => mapping.town_city = value.clone(),
            "postal_code" => mapping.postal_code = Some(value.clone()),
            "state" => mapping.state = Some(value.clone()),
            "state_code" => mapping.state_code = Some(value.clone()),
            "country" => mapping.country = Some(value.clone()),
            "country_code" => mapping.country_code = Some(value.clone()),
            "latitude" => mapping.latitude = parse_float_field("latitude", value)?,
            "longitude" => mapping.longitude = parse_float_field("longitude", value)?,
            "altitude" => mapping.altitude = parse_float_field("altitude", value)?,
            "gps_error" => mapping.gps_error = parse_gps_error(value)?,
            _ => {}
        }
    }
    Ok(mapping)
}

/// Validates one form submission and resolves it to a canonical address.
///
/// `None` (nothing submitted) resolves to no address, as does a submission
/// without `raw` text. Field coercion failures surface before any storage
/// access happens.
pub fn clean_address<R>(
    service: &AddressService<R>,
    fields: Option<&BTreeMap<String, String>>,
) -> Result<Option<ResolvedAddress>, AddressServiceError>
where
    R: CountryRepository + StateRepository + AddressRepository,
{
    let Some(fields) = fields else {
        return Ok(None);
    };
    let mapping = coerce_form_fields(fields)?;
    service.to_address(Some(AddressInput::Mapping(mapping)))
}

/// Maps a loose JSON value onto the accepted input shapes.
///
/// `null` means no address, a string is free text, an integer is a row
/// key, an object is a field mapping. Any other shape is rejected.
pub fn address_input_from_value(
    value: &Value,
) -> Result<Option<AddressInput>, AddressServiceError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(AddressInput::Text(text.clone()))),
        Value::Number(number) => number
            .as_i64()
            .map(|id| Some(AddressInput::Key(id)))
            .ok_or(AddressServiceError::InvalidValue),
        Value::Object(fields) => Ok(Some(AddressInput::Mapping(mapping_from_object(fields)?))),
        _ => Err(AddressServiceError::InvalidValue),
    }
}

fn mapping_from_object(fields: &Map<String, Value>) -> Result<AddressMapping, AddressServiceError> {
    let mut mapping = AddressMapping::default();
    for (key, value) in fields {
        match key.as_str() {
            "raw" => mapping.raw = text_field(value)?.unwrap_or_default(),
            "street" => mapping.street = text_field(value)?.unwrap_or_default(),
            "town_city" => mapping.town_city = text_field(value)?.unwrap_or_default(),
            "postal_code" => mapping.postal_code = text_field(value)?,
            "state" => mapping.state = text_field(value)?,
            "state_code" => mapping.state_code = text_field(value)?,
            "country" => mapping.country = text_field(value)?,
            "country_code" => mapping.country_code = text_field(value)?,
            "latitude" => mapping.latitude = float_field("latitude", value)?,
            "longitude" => mapping.longitude = float_field("longitude", value)?,
            "altitude" => mapping.altitude = float_field("altitude", value)?,
            "gps_error" => mapping.gps_error = int_field("gps_error", value)?,
            _ => {}
        }
    }
    Ok(mapping)
}

fn text_field(value: &Value) -> Result<Option<String>, AddressServiceError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text.clone())),
        _ => Err(AddressServiceError::InvalidValue),
    }
}

/// Numeric JSON fields additionally accept numeric strings, because HTML
/// form frontends routinely submit numbers as text.
fn float_field(field: &'static str, value: &Value) -> Result<Option<f64>, AddressServiceError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => number
            .as_f64()
            .map(Some)
            .ok_or_else(|| AddressServiceError::InvalidField {
                field,
                value: number.to_string(),
            }),
        Value::String(text) => parse_float_field(field, text),
        other => Err(AddressServiceError::InvalidField {
            field,
            value: other.to_string(),
        }),
    }
}

fn int_field(field: &'static str, value: &Value) -> Result<Option<u16>, AddressServiceError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => number
            .as_u64()
            .and_then(|wide| u16::try_from(wide).ok())
            .map(Some)
            .ok_or_else(|| AddressServiceError::InvalidField {
                field,
                value: number.to_string(),
            }),
        Value::String(text) => parse_gps_error(text),
        other => Err(AddressServiceError::InvalidField {
            field,
            value: other.to_string(),
        }),
    }
}

fn parse_float_field(field: &'static str, value: &str) -> Result<Option<f64>, AddressServiceError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| AddressServiceError::InvalidField {
            field,
            value: value.to_string(),
        })
}

fn parse_gps_error(value: &str) -> Result<Option<u16>, AddressServiceError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<u16>()
        .map(Some)
        .map_err(|_| AddressServiceError::InvalidField {
            field: "gps_error",
            value: value.to_string(),
        })
}
