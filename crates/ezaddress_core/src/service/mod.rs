//! Use-case services over the repository layer.
//!
//! # Responsibility
//! - Orchestrate repository calls into normalization-level APIs.
//! - Keep callers decoupled from SQL and storage details.
//!
//! # See also
//! - docs/architecture/normalization.md

pub mod address_service;
