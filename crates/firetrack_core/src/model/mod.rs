//! Loosely typed document model shared by every kind.
//!
//! # Responsibility
//! - Define the record shape persisted by the document store.
//! - Keep kind-specific attributes as named fields instead of Rust structs,
//!   so installs can extend kinds without code changes.
//!
//! # Invariants
//! - Every document is identified by `(kind, name)`.
//! - `name` is reserved and never stored as an ordinary field.

pub mod document;
