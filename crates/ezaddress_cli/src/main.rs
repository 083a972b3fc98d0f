//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `ezaddress_core` linkage.
//! - Normalize one command-line address against a throwaway store.

use ezaddress_core::db::open_db_in_memory;
use ezaddress_core::{AddressInput, AddressService, ResolvedAddress, SqliteAddressRepository};

fn main() {
    println!("ezaddress_core version={}", ezaddress_core::core_version());

    let raw = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if raw.is_empty() {
        return;
    }

    // Why: an in-memory store exercises the full open/migrate/normalize
    // path without leaving files behind.
    let outcome = open_db_in_memory()
        .map_err(|err| err.to_string())
        .and_then(|conn| {
            let repo = SqliteAddressRepository::try_new(&conn).map_err(|err| err.to_string())?;
            let service = AddressService::new(repo);
            service
                .to_address(Some(AddressInput::Text(raw)))
                .map_err(|err| err.to_string())
        });

    match outcome {
        Ok(Some(ResolvedAddress::Record(address))) => {
            println!("normalized id={} display={}", address.id, address);
        }
        Ok(_) => println!("normalized none"),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
