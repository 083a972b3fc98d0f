//! Domain models shared by every layer of the core crate.
//!
//! # Responsibility
//! - Define the canonical Country/State/Address record graph.
//! - Define the input shapes accepted by the normalization service.
//!
//! # Invariants
//! - Models never touch storage; persistence lives in `repo`.
//! - Field-shape validation is total and side-effect free.
//!
//! # See also
//! - docs/architecture/data-model.md

pub mod address;
pub mod input;
