//! User profile and address use-cases.
//!
//! # Responsibility
//! - Store a user's signature in whichever signature field the install has.
//! - Attach coordinates to address documents when geo fields exist.
//! - Link a user to a contact, creating a minimal one when missing.

use super::{required, ServiceError, ServiceResult};
use crate::access::{SchemaAccessor, LATITUDE_FIELDS, LONGITUDE_FIELDS, SIGNATURE_FIELDS};
use crate::model::document::{Document, DocumentName, FieldValue};
use crate::repo::document_repo::DocumentStore;
use crate::schema::SchemaMetadata;
use log::{debug, info};

const CONTACT_LINK_FIELDS: &[&str] = &["user", "email_id"];

/// Which coordinates [`ProfileService::apply_geo`] wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeoWrite {
    pub latitude: Option<&'static str>,
    pub longitude: Option<&'static str>,
}

pub struct ProfileService<M, S> {
    access: SchemaAccessor<M, S>,
}

impl<M: SchemaMetadata, S: DocumentStore> ProfileService<M, S> {
    pub fn new(access: SchemaAccessor<M, S>) -> Self {
        Self { access }
    }

    pub fn access(&self) -> &SchemaAccessor<M, S> {
        &self.access
    }

    /// First signature field defined on `user`.
    pub fn signature_field(&self) -> Option<&'static str> {
        self.access.first_existing_field("user", SIGNATURE_FIELDS)
    }

    /// Saves `file_url` into the user's signature field.
    ///
    /// Returns the field written.
    pub fn save_signature(&self, user: &str, file_url: &str) -> ServiceResult<&'static str> {
        let user = required(Some(user), "user is required")?;
        let file_url = required(Some(file_url), "No file")?;
        let field = self
            .signature_field()
            .ok_or(ServiceError::SignatureFieldMissing)?;

        let user = DocumentName::new(user);
        if !self
            .access
            .persist_if_defined("user", &user, field, file_url.as_str())?
        {
            return Err(ServiceError::SignatureFieldMissing);
        }
        info!("event=signature_save module=service status=ok field={field}");
        Ok(field)
    }

    /// Writes coordinates into the first defined latitude/longitude fields of
    /// an in-memory address document. Unparsable or absent values are skipped.
    pub fn apply_geo(
        &self,
        address: &mut Document,
        latitude: Option<&str>,
        longitude: Option<&str>,
    ) -> GeoWrite {
        let mut written = GeoWrite::default();
        if let Some(value) = latitude.and_then(parse_coordinate) {
            written.latitude = self.write_first(address, LATITUDE_FIELDS, value);
        }
        if let Some(value) = longitude.and_then(parse_coordinate) {
            written.longitude = self.write_first(address, LONGITUDE_FIELDS, value);
        }
        written
    }

    /// Contact linked to `user_id`, created when the install has contacts but
    /// none matches. `None` when the install has no `contact` kind, or when
    /// `contact` defines neither `user` nor `email_id`.
    pub fn ensure_contact_for_user(&self, user_id: &str) -> ServiceResult<Option<DocumentName>> {
        let user_id = required(Some(user_id), "user is required")?;
        if !self.access.kind_exists("contact") {
            return Ok(None);
        }
        // Without a field that records the user, a created contact could
        // never be found again.
        if self
            .access
            .first_existing_field("contact", CONTACT_LINK_FIELDS)
            .is_none()
        {
            debug!("event=contact_link module=service status=skip reason=no_link_field");
            return Ok(None);
        }

        if let Some(found) = self
            .access
            .resolve_link_target("contact", CONTACT_LINK_FIELDS, &user_id)?
        {
            return Ok(Some(found));
        }

        let user_name = DocumentName::new(user_id.as_str());
        let user = self
            .access
            .store()
            .get_document("user", &user_name)?
            .ok_or_else(|| ServiceError::NotFound {
                kind: "user".to_string(),
                name: user_id.clone(),
            })?;
        let first_name = ["first_name", "full_name"]
            .into_iter()
            .map(|field| self.access.get_optional(&user, field, FieldValue::Null))
            .find(|value| !value.is_blank())
            .unwrap_or_else(|| FieldValue::from(&user.name));

        let mut contact = Document::new("contact");
        self.access.set_if_defined(&mut contact, "first_name", first_name);
        self.access.set_if_defined(&mut contact, "user", user_id.as_str());
        self.access.set_if_defined(&mut contact, "email_id", user_id.as_str());
        let name = self.access.store().create_document(&contact)?;
        info!("event=contact_create module=service status=ok name={name}");
        Ok(Some(name))
    }

    fn write_first(
        &self,
        document: &mut Document,
        candidates: &[&'static str],
        value: f64,
    ) -> Option<&'static str> {
        let field = self.access.first_existing_field(&document.kind, candidates)?;
        self.access.set_if_defined(document, field, value);
        Some(field)
    }
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    FieldValue::from(raw).as_f64().filter(|value| value.is_finite())
}
