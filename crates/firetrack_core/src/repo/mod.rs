//! Persistence boundary for documents.
//!
//! # Responsibility
//! - Define the `DocumentStore` contract used by accessors and services.
//! - Keep SQLite query details out of access/service code.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NotFound`, `Conflict`) in addition
//!   to DB transport errors.
//! - Stores never consult schema metadata; tolerance lives one layer up.

pub mod document_repo;
