//! Address graph repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable find/create/update/list APIs over `countries`,
//!   `states` and `addresses` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call model validation before SQL mutations.
//! - Unique-constraint hits surface as `RepoError::UniqueViolation`,
//!   distinct from not-found and validation failures.
//! - Lookups returning a single row resolve ties by lowest id.
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::address::{
    Address, AddressId, Country, CountryId, State, StateId, ValidationError,
};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const COUNTRY_SELECT_SQL: &str = "SELECT
    id,
    name,
    code
FROM countries";

const STATE_SELECT_SQL: &str = "SELECT
    s.id AS state_id,
    s.name AS state_name,
    s.code AS state_code,
    c.id AS country_id,
    c.name AS country_name,
    c.code AS country_code
FROM states s
JOIN countries c ON c.id = s.country_id";

const ADDRESS_SELECT_SQL: &str = "SELECT
    a.id,
    a.raw,
    a.street,
    a.town_city,
    a.postal_code,
    a.latitude,
    a.longitude,
    a.altitude,
    a.gps_error,
    s.id AS state_id,
    s.name AS state_name,
    s.code AS state_code,
    c.id AS country_id,
    c.name AS country_name,
    c.code AS country_code
FROM addresses a
LEFT JOIN states s ON s.id = a.state_id
LEFT JOIN countries c ON c.id = s.country_id";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for address graph persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound {
        entity: &'static str,
        id: i64,
    },
    /// A storage uniqueness constraint fired, typically from a racing
    /// writer inserting the same natural key between find and create.
    UniqueViolation(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UniqueViolation(message) => write!(f, "unique constraint violated: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection not ready: schema version {actual_version}, expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table: {table}"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column: {table}.{column}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(code, message)
                if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Self::UniqueViolation(message.unwrap_or_else(|| code.to_string()))
            }
            other => Self::Db(DbError::Sqlite(other)),
        }
    }
}

/// Write model for inserting one address row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAddress {
    pub raw: String,
    pub street: String,
    pub town_city: String,
    pub postal_code: String,
    pub state_id: Option<StateId>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub gps_error: Option<u16>,
}

impl NewAddress {
    /// Write model carrying only raw text, used by the bare-string and
    /// downgrade insert paths.
    pub fn raw_only(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        Address::validate_fields(&self.raw, &self.street, &self.town_city, &self.postal_code)
    }
}

/// Repository interface for country rows.
pub trait CountryRepository {
    /// Exact-match lookup on the unique country name.
    fn find_country_by_name(&self, name: &str) -> RepoResult<Option<Country>>;
    /// Validates and inserts one country, returning the stored row.
    fn create_country(&self, name: &str, code: &str) -> RepoResult<Country>;
    /// Rewrites name and code of an existing country row.
    fn update_country(&self, country: &Country) -> RepoResult<()>;
    /// All countries ordered by name.
    fn list_countries(&self) -> RepoResult<Vec<Country>>;
}

/// Repository interface for state rows.
pub trait StateRepository {
    /// Lookup by name alone; country scope is deliberately not applied.
    /// When several countries share a state name the lowest id wins.
    fn find_state_by_name(&self, name: &str) -> RepoResult<Option<State>>;
    /// Validates and inserts one state under `country`.
    fn create_state(
        &self,
        name: &str,
        code: &str,
        country: Option<&Country>,
    ) -> RepoResult<State>;
    /// Rewrites name, code and owning country of an existing state row.
    fn update_state(&self, state: &State) -> RepoResult<()>;
    /// All states ordered by country name, then state name.
    fn list_states(&self) -> RepoResult<Vec<State>>;
}

/// Repository interface for address rows.
pub trait AddressRepository {
    /// Gets one address by id, fully materialized.
    fn get_address(&self, id: AddressId) -> RepoResult<Option<Address>>;
    /// Exact-match lookup on raw text; oldest row wins on duplicates.
    fn find_address_by_raw(&self, raw: &str) -> RepoResult<Option<Address>>;
    /// Component lookup used by structured dedup. Matches street,
    /// town/city, postal code and state link; `raw` is not part of
    /// the key. `state` of `None` matches rows without a state.
    fn find_address_by_fields(
        &self,
        street: &str,
        town_city: &str,
        postal_code: &str,
        state: Option<StateId>,
    ) -> RepoResult<Option<Address>>;
    /// Validates and inserts one address row, returning its id.
    fn create_address(&self, address: &NewAddress) -> RepoResult<AddressId>;
    /// Rewrites all mutable fields of an existing address row.
    fn update_address(&self, address: &Address) -> RepoResult<()>;
    /// All addresses in canonical listing order: country name, state
    /// name, town/city, postal code, street. Stateless rows sort first.
    fn list_addresses(&self) -> RepoResult<Vec<Address>>;
}

/// SQLite-backed repository covering the whole entity graph.
pub struct SqliteAddressRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAddressRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CountryRepository for SqliteAddressRepository<'_> {
    fn find_country_by_name(&self, name: &str) -> RepoResult<Option<Country>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COUNTRY_SELECT_SQL} WHERE name = ?1;"))?;
        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_country_row(row)?));
        }
        Ok(None)
    }

    fn create_country(&self, name: &str, code: &str) -> RepoResult<Country> {
        Country::validate_fields(name, code)?;

        self.conn.execute(
            "INSERT INTO countries (name, code) VALUES (?1, ?2);",
            params![name, code],
        )?;

        Ok(Country {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            code: code.to_string(),
        })
    }

    fn update_country(&self, country: &Country) -> RepoResult<()> {
        country.validate()?;

        let changed = self.conn.execute(
            "UPDATE countries SET name = ?2, code = ?3 WHERE id = ?1;",
            params![country.id, country.name, country.code],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "country",
                id: country.id,
            });
        }

        Ok(())
    }

    fn list_countries(&self) -> RepoResult<Vec<Country>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COUNTRY_SELECT_SQL} ORDER BY name ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut countries = Vec::new();
        while let Some(row) = rows.next()? {
            countries.push(parse_country_row(row)?);
        }
        Ok(countries)
    }
}

impl StateRepository for SqliteAddressRepository<'_> {
    fn find_state_by_name(&self, name: &str) -> RepoResult<Option<State>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STATE_SELECT_SQL} WHERE s.name = ?1 ORDER BY s.id ASC LIMIT 1;"
        ))?;
        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_state_row(row)?));
        }
        Ok(None)
    }

    fn create_state(
        &self,
        name: &str,
        code: &str,
        country: Option<&Country>,
    ) -> RepoResult<State> {
        State::validate_fields(name, code, country.is_some())?;

        let country_id = country.map(|country| country.id);
        self.conn.execute(
            "INSERT INTO states (name, code, country_id) VALUES (?1, ?2, ?3);",
            params![name, code, country_id],
        )?;

        Ok(State {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            code: code.to_string(),
            country: country.cloned(),
        })
    }

    fn update_state(&self, state: &State) -> RepoResult<()> {
        state.validate()?;

        let country_id = state.country.as_ref().map(|country| country.id);
        let changed = self.conn.execute(
            "UPDATE states SET name = ?2, code = ?3, country_id = ?4 WHERE id = ?1;",
            params![state.id, state.name, state.code, country_id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "state",
                id: state.id,
            });
        }

        Ok(())
    }

    fn list_states(&self) -> RepoResult<Vec<State>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STATE_SELECT_SQL} ORDER BY c.name ASC, s.name ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut states = Vec::new();
        while let Some(row) = rows.next()? {
            states.push(parse_state_row(row)?);
        }
        Ok(states)
    }
}

impl AddressRepository for SqliteAddressRepository<'_> {
    fn get_address(&self, id: AddressId) -> RepoResult<Option<Address>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ADDRESS_SELECT_SQL} WHERE a.id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_address_row(row)?));
        }
        Ok(None)
    }

    fn find_address_by_raw(&self, raw: &str) -> RepoResult<Option<Address>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ADDRESS_SELECT_SQL} WHERE a.raw = ?1 ORDER BY a.id ASC LIMIT 1;"
        ))?;
        let mut rows = stmt.query([raw])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_address_row(row)?));
        }
        Ok(None)
    }

    fn find_address_by_fields(
        &self,
        street: &str,
        town_city: &str,
        postal_code: &str,
        state: Option<StateId>,
    ) -> RepoResult<Option<Address>> {
        // `IS` instead of `=` so a None state matches NULL state_id rows.
        let mut stmt = self.conn.prepare(&format!(
            "{ADDRESS_SELECT_SQL}
             WHERE a.street = ?1
               AND a.town_city = ?2
               AND a.postal_code = ?3
               AND a.state_id IS ?4
             ORDER BY a.id ASC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query(params![street, town_city, postal_code, state])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_address_row(row)?));
        }
        Ok(None)
    }

    fn create_address(&self, address: &NewAddress) -> RepoResult<AddressId> {
        address.validate()?;

        self.conn.execute(
            "INSERT INTO addresses (
                raw,
                street,
                town_city,
                postal_code,
                state_id,
                latitude,
                longitude,
                altitude,
                gps_error
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                address.raw.as_str(),
                address.street.as_str(),
                address.town_city.as_str(),
                address.postal_code.as_str(),
                address.state_id,
                address.latitude,
                address.longitude,
                address.altitude,
                address.gps_error,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_address(&self, address: &Address) -> RepoResult<()> {
        address.validate()?;

        let state_id = address.state.as_ref().map(|state| state.id);
        let changed = self.conn.execute(
            "UPDATE addresses
             SET
                raw = ?2,
                street = ?3,
                town_city = ?4,
                postal_code = ?5,
                state_id = ?6,
                latitude = ?7,
                longitude = ?8,
                altitude = ?9,
                gps_error = ?10
             WHERE id = ?1;",
            params![
                address.id,
                address.raw.as_str(),
                address.street.as_str(),
                address.town_city.as_str(),
                address.postal_code.as_str(),
                state_id,
                address.latitude,
                address.longitude,
                address.altitude,
                address.gps_error,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "address",
                id: address.id,
            });
        }

        Ok(())
    }

    fn list_addresses(&self) -> RepoResult<Vec<Address>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ADDRESS_SELECT_SQL}
             ORDER BY c.name ASC, s.name ASC, a.town_city ASC, a.postal_code ASC, a.street ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut addresses = Vec::new();
        while let Some(row) = rows.next()? {
            addresses.push(parse_address_row(row)?);
        }
        Ok(addresses)
    }
}

fn parse_country_row(row: &Row<'_>) -> RepoResult<Country> {
    Ok(Country {
        id: row.get("id")?,
        name: row.get("name")?,
        code: row.get("code")?,
    })
}

fn parse_state_row(row: &Row<'_>) -> RepoResult<State> {
    Ok(State {
        id: row.get("state_id")?,
        name: row.get("state_name")?,
        code: row.get("state_code")?,
        country: parse_country_columns(row)?,
    })
}

fn parse_address_row(row: &Row<'_>) -> RepoResult<Address> {
    let state = match row.get::<_, Option<StateId>>("state_id")? {
        Some(id) => Some(State {
            id,
            name: row.get("state_name")?,
            code: row.get("state_code")?,
            country: parse_country_columns(row)?,
        }),
        None => None,
    };

    Ok(Address {
        id: row.get("id")?,
        raw: row.get("raw")?,
        street: row.get("street")?,
        town_city: row.get("town_city")?,
        postal_code: row.get("postal_code")?,
        state,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        altitude: row.get("altitude")?,
        gps_error: row.get("gps_error")?,
    })
}

fn parse_country_columns(row: &Row<'_>) -> RepoResult<Option<Country>> {
    Ok(match row.get::<_, Option<CountryId>>("country_id")? {
        Some(id) => Some(Country {
            id,
            name: row.get("country_name")?,
            code: row.get("country_code")?,
        }),
        None => None,
    })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["countries", "states", "addresses"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    for column in ["altitude", "gps_error"] {
        if !table_has_column(conn, "addresses", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "addresses",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
