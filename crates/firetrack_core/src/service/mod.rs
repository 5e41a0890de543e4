//! Thin use-case handlers over schema-tolerant access.
//!
//! # Responsibility
//! - Validate required inputs and shape documents for one use-case each.
//! - Route every optional attribute through `SchemaAccessor`.
//!
//! # Invariants
//! - Services never talk to SQL directly; storage stays behind the
//!   `DocumentStore` trait.
//! - Required-input failures are reported as `ServiceError::InvalidInput`
//!   before any store mutation.

use crate::access::AccessError;
use crate::repo::document_repo::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod asset_service;
pub mod customer_service;
pub mod profile_service;
pub mod schedule_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for handler-level use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Required input missing or malformed; message is user-facing.
    InvalidInput(String),
    /// Referenced document does not exist.
    NotFound { kind: String, name: String },
    /// No signature field is defined on `user` in this install.
    SignatureFieldMissing,
    /// Access/persistence failure.
    Access(AccessError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => f.write_str(message),
            Self::NotFound { kind, name } => write!(f, "{kind} not found: {name}"),
            Self::SignatureFieldMissing => write!(
                f,
                "user signature field not found; define `user_signature` (or `signature`/`signature_image`) on user"
            ),
            Self::Access(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Access(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AccessError> for ServiceError {
    fn from(value: AccessError) -> Self {
        match value {
            AccessError::Store(StoreError::NotFound { kind, name }) => Self::NotFound {
                kind,
                name: name.to_string(),
            },
            other => Self::Access(other),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        AccessError::from(value).into()
    }
}

/// Trims `value` and rejects blanks with `message`.
fn required(value: Option<&str>, message: &str) -> ServiceResult<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServiceError::InvalidInput(message.to_string()))
}

/// Non-blank trimmed text, if any.
fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
