//! Schema-tolerant document access.
//!
//! # Responsibility
//! - Check optional fields/kinds before reading or writing them, so installs
//!   that have not defined every optional attribute keep working.
//! - Resolve documents by natural key and create them when absent.
//!
//! # Invariants
//! - Schema absence is data: lookups answer `false`/`None`/default and never
//!   error. Metadata failures are logged and treated as absence.
//! - Store failures are never swallowed; they surface as `AccessError::Store`.
//! - `ensure_document` issues at most one create per call.
//! - No ambient state: both collaborators are injected.

use crate::model::document::{Document, DocumentName, FieldValue, NAME_FIELD};
use crate::repo::document_repo::{DocumentStore, FieldFilter, StoreError};
use crate::schema::SchemaMetadata;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod fallback;

pub use fallback::FallbackChain;

/// Signature attachment fields that may exist on `user`, in priority order.
pub const SIGNATURE_FIELDS: &[&str] = &["user_signature", "signature", "signature_image"];
/// Latitude fields that may exist on `address`, in priority order.
pub const LATITUDE_FIELDS: &[&str] = &["latitude", "lat", "geo_latitude"];
/// Longitude fields that may exist on `address`, in priority order.
pub const LONGITUDE_FIELDS: &[&str] = &["longitude", "lon", "geo_longitude"];

pub type AccessResult<T> = Result<T, AccessError>;

#[derive(Debug)]
pub enum AccessError {
    Store(StoreError),
    /// Neither `name` nor any defined field can carry the natural key.
    NoUsableKey { kind: String },
    /// The natural key value is blank.
    BlankKey { kind: String },
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::NoUsableKey { kind } => {
                write!(f, "no natural key field is defined on {kind}")
            }
            Self::BlankKey { kind } => write!(f, "natural key for {kind} must not be blank"),
        }
    }
}

impl Error for AccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::NoUsableKey { .. } | Self::BlankKey { .. } => None,
        }
    }
}

impl From<StoreError> for AccessError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Accessor combining schema metadata and a document store.
pub struct SchemaAccessor<M, S> {
    schema: M,
    store: S,
}

impl<M: SchemaMetadata, S: DocumentStore> SchemaAccessor<M, S> {
    pub fn new(schema: M, store: S) -> Self {
        Self { schema, store }
    }

    pub fn schema(&self) -> &M {
        &self.schema
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether `kind` defines `field`. Lookup failures count as absent.
    pub fn field_exists(&self, kind: &str, field: &str) -> bool {
        match self.schema.has_field(kind, field) {
            Ok(exists) => exists,
            Err(err) => {
                warn!(
                    "event=field_lookup module=access status=error kind={kind} field={field} error={err}"
                );
                false
            }
        }
    }

    /// Whether `kind` is defined at all. Lookup failures count as absent.
    pub fn kind_exists(&self, kind: &str) -> bool {
        match self.schema.kind_exists(kind) {
            Ok(exists) => exists,
            Err(err) => {
                warn!("event=kind_lookup module=access status=error kind={kind} error={err}");
                false
            }
        }
    }

    /// First candidate, in the given order, that `kind` defines.
    pub fn first_existing_field<'c>(&self, kind: &str, candidates: &[&'c str]) -> Option<&'c str> {
        candidates
            .iter()
            .copied()
            .find(|candidate| self.field_exists(kind, candidate))
    }

    /// Whether `field` on `kind` is declared as a link to `target`.
    pub fn is_link_field(&self, kind: &str, field: &str, target: &str) -> bool {
        match self.schema.describe_field(kind, field) {
            Ok(descriptor) => descriptor.is_some_and(|descriptor| descriptor.links_to(target)),
            Err(err) => {
                warn!(
                    "event=field_lookup module=access status=error kind={kind} field={field} error={err}"
                );
                false
            }
        }
    }

    /// Writes `value` into the in-memory `document` when its kind defines
    /// `field`. Returns whether the write happened.
    pub fn set_if_defined(
        &self,
        document: &mut Document,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> bool {
        if !self.field_exists(&document.kind, field) {
            debug!(
                "event=field_write module=access status=skip kind={} field={field}",
                document.kind
            );
            return false;
        }
        document.set(field, value);
        true
    }

    /// Persists one field of a stored document when `kind` defines it.
    ///
    /// Performs exactly one store mutation when defined and none otherwise.
    pub fn persist_if_defined(
        &self,
        kind: &str,
        name: &DocumentName,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> AccessResult<bool> {
        if field == NAME_FIELD || !self.field_exists(kind, field) {
            debug!("event=field_persist module=access status=skip kind={kind} field={field}");
            return Ok(false);
        }
        self.store.set_field(kind, name, field, &value.into())?;
        Ok(true)
    }

    /// Reads `field` when defined and set on `document`, else `default`.
    pub fn get_optional(&self, document: &Document, field: &str, default: FieldValue) -> FieldValue {
        if field == NAME_FIELD {
            return FieldValue::from(&document.name);
        }
        if !self.field_exists(&document.kind, field) {
            return default;
        }
        document.get(field).cloned().unwrap_or(default)
    }

    /// Finds a document by the first natural key that matches.
    ///
    /// `name` matches document identity; other keys are tried only when
    /// `kind` defines them. Creates nothing.
    pub fn resolve_link_target(
        &self,
        kind: &str,
        natural_key_fields: &[&str],
        value: &str,
    ) -> AccessResult<Option<DocumentName>> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }

        for key in natural_key_fields {
            if *key == NAME_FIELD {
                let name = DocumentName::new(value);
                if self.store.document_exists(kind, &name)? {
                    return Ok(Some(name));
                }
                continue;
            }
            if !self.field_exists(kind, key) {
                continue;
            }
            if let Some(name) = self.store.find_by_field(kind, &FieldFilter::eq(*key, value))? {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    /// Returns the document matching the natural key, creating it if absent.
    ///
    /// A created document takes `value` as its name when `name` is one of
    /// the keys, gets `value` in every other defined key field, and receives
    /// each of `defaults` whose field is defined.
    ///
    /// A store `Conflict` on create (another writer claimed the same name)
    /// triggers one re-resolve. Keys held only in ordinary fields carry no
    /// uniqueness, so concurrent callers can still create duplicates there.
    pub fn ensure_document(
        &self,
        kind: &str,
        natural_key_fields: &[&str],
        value: &str,
        defaults: &[(&str, FieldValue)],
    ) -> AccessResult<DocumentName> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AccessError::BlankKey {
                kind: kind.to_string(),
            });
        }
        if let Some(existing) = self.resolve_link_target(kind, natural_key_fields, value)? {
            return Ok(existing);
        }

        let mut document = if natural_key_fields.contains(&NAME_FIELD) {
            Document::with_name(kind, value)
        } else {
            Document::new(kind)
        };

        let mut keyed = natural_key_fields.contains(&NAME_FIELD);
        for key in natural_key_fields.iter().filter(|key| **key != NAME_FIELD) {
            keyed |= self.set_if_defined(&mut document, key, value);
        }
        if !keyed {
            return Err(AccessError::NoUsableKey {
                kind: kind.to_string(),
            });
        }

        for (field, default) in defaults {
            if document.get(field).is_none() {
                self.set_if_defined(&mut document, field, default.clone());
            }
        }

        match self.store.create_document(&document) {
            Ok(name) => {
                info!("event=ensure_document module=access status=created kind={kind} name={name}");
                Ok(name)
            }
            Err(StoreError::Conflict { kind: conflict_kind, name }) => {
                warn!(
                    "event=ensure_document module=access status=conflict kind={conflict_kind} name={name}"
                );
                self.resolve_link_target(kind, natural_key_fields, value)?
                    .ok_or(AccessError::Store(StoreError::Conflict {
                        kind: conflict_kind,
                        name,
                    }))
            }
            Err(err) => Err(err.into()),
        }
    }
}
