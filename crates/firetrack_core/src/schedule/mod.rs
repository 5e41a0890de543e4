//! Recurring inspection schedule arithmetic.
//!
//! # Responsibility
//! - Map frequency codes to calendar-month steps.
//! - Parse free-form "when" input into an instant or a required date.
//!
//! # Invariants
//! - Everything here is pure: no I/O, no logging, no panics.
//! - Unknown or malformed input degrades to `None`, never to an error.

pub mod recurrence;
