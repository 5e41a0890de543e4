//! Explicit per-request context handed to services.
//!
//! # Responsibility
//! - Carry caller identity, roles and the merged request payload.
//! - Resolve a parameter from payload or explicit argument in one place.
//!
//! # Invariants
//! - Payload values win over explicit arguments; blank text counts as absent.
//! - A malformed JSON body yields an empty payload, never an error.

use crate::model::document::FieldValue;
use log::warn;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub user: String,
    pub roles: Vec<String>,
    pub payload: BTreeMap<String, FieldValue>,
}

impl RequestContext {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Self::default()
        }
    }

    pub fn with_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Merges scalar members of a JSON object body into the payload.
    ///
    /// Nested arrays/objects are skipped.
    pub fn with_json_body(mut self, body: &str) -> Self {
        if body.trim().is_empty() {
            return self;
        }
        match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(body) {
            Ok(object) => {
                for (key, value) in object {
                    if let Ok(scalar) = serde_json::from_value::<FieldValue>(value) {
                        self.payload.insert(key, scalar);
                    }
                }
            }
            Err(err) => {
                warn!("event=request_body module=context status=error error={err}");
            }
        }
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|candidate| candidate == role)
    }

    /// Payload value for `name`, else `explicit`; blank values are skipped.
    pub fn param(&self, name: &str, explicit: Option<&str>) -> Option<String> {
        self.payload
            .get(name)
            .filter(|value| !value.is_blank())
            .map(ToString::to_string)
            .or_else(|| {
                explicit
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
            })
    }
}
