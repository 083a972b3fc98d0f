use ezaddress_core::db::open_db_in_memory;
use ezaddress_core::{
    Address, AddressInput, AddressMapping, AddressRepository, AddressService,
    AddressServiceError, CountryRepository, ResolvedAddress, SqliteAddressRepository,
    StateRepository,
};
use rusqlite::Connection;

#[test]
fn none_input_resolves_to_none() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert!(service.to_address(None).unwrap().is_none());
}

#[test]
fn empty_text_resolves_to_none() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert!(service
        .to_address(Some(AddressInput::text("")))
        .unwrap()
        .is_none());
    assert_eq!(address_count(&conn), 0);
}

#[test]
fn text_input_always_inserts_a_fresh_row() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let first = resolve_record(&service, AddressInput::text("5 High St, Ikeja"));
    let second = resolve_record(&service, AddressInput::text("5 High St, Ikeja"));

    assert_eq!(first.raw, "5 High St, Ikeja");
    assert!(first.state.is_none());
    // Bare strings never deduplicate.
    assert_ne!(first.id, second.id);
    assert_eq!(address_count(&conn), 2);
}

#[test]
fn key_input_passes_through_without_dereferencing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    // The key is not checked against storage.
    let resolved = service
        .to_address(Some(AddressInput::Key(12345)))
        .unwrap()
        .unwrap();
    assert_eq!(resolved, ResolvedAddress::Key(12345));
    assert_eq!(resolved.id(), 12345);
    assert!(resolved.into_record().is_none());
    assert_eq!(address_count(&conn), 0);
}

#[test]
fn record_input_passes_through_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let address = Address {
        id: 77,
        raw: "already materialized".to_string(),
        street: String::new(),
        town_city: String::new(),
        postal_code: String::new(),
        state: None,
        latitude: None,
        longitude: None,
        altitude: None,
        gps_error: None,
    };

    let resolved = service
        .to_address(Some(AddressInput::Record(address.clone())))
        .unwrap()
        .unwrap();
    assert_eq!(resolved, ResolvedAddress::Record(address));
    assert_eq!(address_count(&conn), 0);
}

#[test]
fn mapping_creates_the_full_entity_graph() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let record = resolve_record(&service, AddressInput::Mapping(lagos_mapping()));

    assert!(record.id > 0);
    assert_eq!(record.raw, "No 1 Bank Road, Eko 720015, Lagos, Nigeria ::");
    assert_eq!(record.street, "No 1 Bank Road");
    assert_eq!(record.town_city, "Eko");
    assert_eq!(record.postal_code, "720015");
    assert_eq!(record.latitude, Some(6.45));
    assert_eq!(record.longitude, Some(3.4));

    let state = record.state.as_ref().unwrap();
    assert_eq!(state.name, "Lagos");
    assert_eq!(state.code, "LG");
    let country = state.country.as_ref().unwrap();
    assert_eq!(country.name, "Nigeria");
    assert_eq!(country.code, "NG");

    assert_eq!(
        record.to_string(),
        "No 1 Bank Road, Eko 720015, Lagos, Nigeria"
    );
}

#[test]
fn mapping_with_same_components_returns_the_stored_row() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let first = resolve_record(&service, AddressInput::Mapping(lagos_mapping()));

    let mut resubmission = lagos_mapping();
    resubmission.raw = "Eko branch office ::".to_string();
    resubmission.latitude = Some(99.0);
    let second = resolve_record(&service, AddressInput::Mapping(resubmission));

    // The stored row wins; the new raw text and GPS fix are discarded.
    assert_eq!(second.id, first.id);
    assert_eq!(second.raw, "No 1 Bank Road, Eko 720015, Lagos, Nigeria ::");
    assert_eq!(second.latitude, Some(6.45));
    assert_eq!(address_count(&conn), 1);
}

#[test]
fn as_mapping_round_trips_to_the_same_entities() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let first = resolve_record(&service, AddressInput::Mapping(lagos_mapping()));
    let second = resolve_record(&service, AddressInput::Mapping(first.as_mapping()));

    // The flattened mapping carries the same dedup key, so resolution
    // lands on the stored row and the stored country/state.
    assert_eq!(second.id, first.id);
    assert_eq!(second.state, first.state);
}

#[test]
fn mapping_without_components_dedups_on_raw_alone() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let raw_only = AddressMapping {
        raw: "somewhere in Lagos".to_string(),
        ..AddressMapping::default()
    };

    let first = resolve_record(&service, AddressInput::Mapping(raw_only.clone()));
    let second = resolve_record(&service, AddressInput::Mapping(raw_only));
    assert_eq!(first.id, second.id);
    assert_eq!(address_count(&conn), 1);

    // The text shape skips dedup even for an identical raw value.
    let third = resolve_record(&service, AddressInput::text("somewhere in Lagos"));
    assert_ne!(third.id, first.id);
    assert_eq!(address_count(&conn), 2);
}

#[test]
fn lone_country_downgrades_to_raw_only_insert() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mapping = AddressMapping {
        raw: "5 High St, Ikeja, Nigeria".to_string(),
        country: Some("Nigeria".to_string()),
        country_code: Some("NG".to_string()),
        street: "5 High St".to_string(),
        town_city: "Ikeja".to_string(),
        latitude: Some(6.6),
        ..AddressMapping::default()
    };
    let record = resolve_record(&service, AddressInput::Mapping(mapping));

    // Every structured field is dropped, only the raw text survives.
    assert_eq!(record.raw, "5 High St, Ikeja, Nigeria");
    assert_eq!(record.street, "");
    assert_eq!(record.town_city, "");
    assert!(record.state.is_none());
    assert_eq!(record.latitude, None);

    // The downgrade happens before any entity resolution.
    let repo = SqliteAddressRepository::try_new(&conn).unwrap();
    assert!(repo.list_countries().unwrap().is_empty());
}

#[test]
fn lone_state_downgrades_to_raw_only_insert() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mapping = AddressMapping {
        raw: "5 High St, Ikeja, Lagos".to_string(),
        state: Some("Lagos".to_string()),
        state_code: Some("LG".to_string()),
        street: "5 High St".to_string(),
        town_city: "Ikeja".to_string(),
        ..AddressMapping::default()
    };
    let record = resolve_record(&service, AddressInput::Mapping(mapping));

    assert_eq!(record.raw, "5 High St, Ikeja, Lagos");
    assert!(record.state.is_none());

    let repo = SqliteAddressRepository::try_new(&conn).unwrap();
    assert!(repo.list_states().unwrap().is_empty());
}

#[test]
fn mapping_without_raw_resolves_to_none_even_when_inconsistent() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    // The empty-raw check runs before the consistency gate.
    let mapping = AddressMapping {
        country: Some("Nigeria".to_string()),
        ..AddressMapping::default()
    };
    assert!(service
        .to_address(Some(AddressInput::Mapping(mapping)))
        .unwrap()
        .is_none());
    assert_eq!(address_count(&conn), 0);
}

#[test]
fn too_long_country_code_fails_resolution() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut mapping = lagos_mapping();
    mapping.country_code = Some("NGRA".to_string());
    let err = service
        .to_address(Some(AddressInput::Mapping(mapping)))
        .unwrap_err();
    match err {
        AddressServiceError::InvalidCountryCode(code) => assert_eq!(code, "NGRA"),
        other => panic!("unexpected error: {other}"),
    }

    // Nothing was inserted before the failure.
    assert_eq!(address_count(&conn), 0);
    let repo = SqliteAddressRepository::try_new(&conn).unwrap();
    assert!(repo.list_countries().unwrap().is_empty());
}

#[test]
fn too_long_state_code_fails_after_country_creation() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut mapping = lagos_mapping();
    mapping.state_code = Some("Lagos4".to_string());
    let err = service
        .to_address(Some(AddressInput::Mapping(mapping)))
        .unwrap_err();
    match err {
        AddressServiceError::InvalidStateCode(code) => assert_eq!(code, "Lagos4"),
        other => panic!("unexpected error: {other}"),
    }

    // Resolution is not transactional: the country row already exists.
    let repo = SqliteAddressRepository::try_new(&conn).unwrap();
    assert!(repo.find_country_by_name("Nigeria").unwrap().is_some());
    assert_eq!(address_count(&conn), 0);
}

#[test]
fn name_repeated_as_code_stores_an_empty_code() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut mapping = lagos_mapping();
    mapping.country_code = Some("Nigeria".to_string());
    mapping.state_code = Some("Lagos".to_string());
    let record = resolve_record(&service, AddressInput::Mapping(mapping));

    let state = record.state.as_ref().unwrap();
    assert_eq!(state.code, "");
    assert_eq!(state.country.as_ref().unwrap().code, "");
}

#[test]
fn existing_country_code_wins_over_submitted_code() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    resolve_record(&service, AddressInput::Mapping(lagos_mapping()));

    let mut resubmission = lagos_mapping();
    resubmission.raw = "Bank Road again ::".to_string();
    resubmission.street = "No 2 Bank Road".to_string();
    resubmission.country_code = Some("XYZ".to_string());
    let record = resolve_record(&service, AddressInput::Mapping(resubmission));

    let country = record.state.as_ref().unwrap().country.as_ref().unwrap();
    assert_eq!(country.code, "NG");

    let repo = SqliteAddressRepository::try_new(&conn).unwrap();
    assert_eq!(repo.list_countries().unwrap().len(), 1);
}

#[test]
fn state_lookup_matches_name_across_countries() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let accra_ghana = AddressMapping {
        raw: "Kotoku Street, Accra, Ghana".to_string(),
        country: Some("Ghana".to_string()),
        country_code: Some("GH".to_string()),
        state: Some("Accra".to_string()),
        state_code: Some("AC".to_string()),
        town_city: "Adabraka".to_string(),
        ..AddressMapping::default()
    };
    resolve_record(&service, AddressInput::Mapping(accra_ghana));

    // A same-named state under another country reuses the stored row.
    let accra_nigeria = AddressMapping {
        raw: "Accra Street, Abuja, Nigeria".to_string(),
        country: Some("Nigeria".to_string()),
        country_code: Some("NG".to_string()),
        state: Some("Accra".to_string()),
        state_code: Some("AC".to_string()),
        town_city: "Wuse".to_string(),
        ..AddressMapping::default()
    };
    let record = resolve_record(&service, AddressInput::Mapping(accra_nigeria));

    let state = record.state.as_ref().unwrap();
    assert_eq!(state.name, "Accra");
    assert_eq!(state.country.as_ref().unwrap().name, "Ghana");

    let repo = SqliteAddressRepository::try_new(&conn).unwrap();
    assert_eq!(repo.list_states().unwrap().len(), 1);
    // The country itself was still created before state resolution.
    assert!(repo.find_country_by_name("Nigeria").unwrap().is_some());
}

#[test]
fn gps_fields_persist_through_the_mapping_path() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut mapping = lagos_mapping();
    mapping.altitude = Some(41.3);
    mapping.gps_error = Some(5);
    let record = resolve_record(&service, AddressInput::Mapping(mapping));

    assert_eq!(record.altitude, Some(41.3));
    assert_eq!(record.gps_error, Some(5));

    let repo = SqliteAddressRepository::try_new(&conn).unwrap();
    let reloaded = repo.get_address(record.id).unwrap().unwrap();
    assert_eq!(reloaded.altitude, Some(41.3));
    assert_eq!(reloaded.gps_error, Some(5));
}

#[test]
fn assign_address_returns_the_storage_key() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert_eq!(service.assign_address(None).unwrap(), None);
    assert_eq!(
        service.assign_address(Some(AddressInput::Key(55))).unwrap(),
        Some(55)
    );

    let id = service
        .assign_address(Some(AddressInput::text("5 High St, Ikeja")))
        .unwrap()
        .unwrap();
    let repo = SqliteAddressRepository::try_new(&conn).unwrap();
    let stored = repo.get_address(id).unwrap().unwrap();
    assert_eq!(stored.raw, "5 High St, Ikeja");
}

fn service(conn: &Connection) -> AddressService<SqliteAddressRepository<'_>> {
    AddressService::new(SqliteAddressRepository::try_new(conn).unwrap())
}

fn resolve_record(
    service: &AddressService<SqliteAddressRepository<'_>>,
    input: AddressInput,
) -> Address {
    service
        .to_address(Some(input))
        .unwrap()
        .unwrap()
        .into_record()
        .unwrap()
}

fn lagos_mapping() -> AddressMapping {
    AddressMapping {
        raw: "No 1 Bank Road, Eko 720015, Lagos, Nigeria ::".to_string(),
        country: Some("Nigeria".to_string()),
        country_code: Some("NG".to_string()),
        state: Some("Lagos".to_string()),
        state_code: Some("LG".to_string()),
        postal_code: Some("720015".to_string()),
        street: "No 1 Bank Road".to_string(),
        town_city: "Eko".to_string(),
        latitude: Some(6.45),
        longitude: Some(3.4),
        altitude: None,
        gps_error: None,
    }
}

fn address_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM addresses;", [], |row| row.get(0))
        .unwrap()
}
