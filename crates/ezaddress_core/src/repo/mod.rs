//! Persistence layer for the address entity graph.
//!
//! # Responsibility
//! - Define repository traits for country/state/address storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Repository writes enforce model validation before persistence.
//! - Reads return fully materialized entities (state embeds country).
//!
//! # See also
//! - docs/architecture/data-model.md

pub mod address_repo;
