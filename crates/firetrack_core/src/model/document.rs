//! Document record and scalar field values.
//!
//! # Responsibility
//! - Define `Document`, the unit of persistence for every kind.
//! - Define `FieldValue`, the scalar payload of one field.
//!
//! # Invariants
//! - `name` is stable once the store has accepted the document.
//! - Dates are carried as ISO text (`YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Reserved field name addressing the document identifier.
pub const NAME_FIELD: &str = "name";

const DATE_TEXT_FORMAT: &str = "%Y-%m-%d";
const DATETIME_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Identifier of a document within its kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentName(String);

impl DocumentName {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a fresh random name for documents without a natural id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocumentName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Scalar value of one document field.
///
/// Serialized untagged so persisted values are plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for `Null` and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(value) => value.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Int(value) => Some(*value != 0),
            _ => None,
        }
    }

    /// Numeric view; text is parsed so form input like `"-33.86"` works.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(value) => write!(f, "{}", u8::from(*value)),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&DocumentName> for FieldValue {
    fn from(value: &DocumentName) -> Self {
        Self::Text(value.as_str().to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::Text(value.format(DATE_TEXT_FORMAT).to_string())
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::Text(value.format(DATETIME_TEXT_FORMAT).to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One persisted record of a named kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub kind: String,
    pub name: DocumentName,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Document {
    /// Creates an empty document with a generated name.
    pub fn new(kind: impl Into<String>) -> Self {
        Self::with_name(kind, DocumentName::generate())
    }

    /// Creates an empty document with a caller-chosen name.
    pub fn with_name(kind: impl Into<String>, name: impl Into<DocumentName>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Returns the raw value of `field`, if set.
    ///
    /// Reading `name` is not supported here; use the `name` member.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Sets `field` to `value`.
    ///
    /// Setting the reserved `name` field renames the document instead.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        let field = field.into();
        let value = value.into();
        if field == NAME_FIELD {
            self.name = DocumentName::new(value.to_string());
            return;
        }
        self.fields.insert(field, value);
    }

    /// Builder form of [`Document::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Text view of `field`; `None` when unset or not text.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }
}
