//! Asset and asset-type use-cases.
//!
//! # Responsibility
//! - Normalize free-text asset status input.
//! - Resolve or create asset types from a label or code.
//! - Create assets, writing install-specific attributes only when defined.
//!
//! # Invariants
//! - Asset status is always one of `Active`, `Inactive`, `Decommissioned`.
//! - Asset-type lookup order is exact name, label, code (both
//!   case-insensitive), then the slug name; a type is created only when all
//!   of them miss.

use super::{optional, required, ServiceError, ServiceResult};
use crate::access::SchemaAccessor;
use crate::model::document::{Document, DocumentName, FieldValue};
use crate::repo::document_repo::{DocumentStore, FieldFilter, StoreError};
use crate::schedule::recurrence::parse_when;
use crate::schema::SchemaMetadata;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

/// Input for [`AssetService::add_asset`]. Blank strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAsset {
    pub property_name: Option<String>,
    pub asset_type: Option<String>,
    pub asset_label: Option<String>,
    pub asset_status: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub identifier: Option<String>,
    pub standard: Option<String>,
    pub install_date: Option<String>,
    pub zone_name: Option<String>,
    pub location_level: Option<String>,
    pub location_area: Option<String>,
    pub location_riser: Option<String>,
    pub location_cupboard: Option<String>,
    pub location_room: Option<String>,
    pub location_notes: Option<String>,
}

/// Created asset summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub name: DocumentName,
    pub label: String,
    pub status: &'static str,
    pub asset_type: DocumentName,
    pub property: DocumentName,
}

pub struct AssetService<M, S> {
    access: SchemaAccessor<M, S>,
}

impl<M: SchemaMetadata, S: DocumentStore> AssetService<M, S> {
    pub fn new(access: SchemaAccessor<M, S>) -> Self {
        Self { access }
    }

    pub fn access(&self) -> &SchemaAccessor<M, S> {
        &self.access
    }

    /// Resolves an asset type by name, label or code, creating it if absent.
    pub fn ensure_asset_type(&self, label_or_code: &str) -> ServiceResult<DocumentName> {
        let value = required(Some(label_or_code), "asset_type is required")?;
        let store = self.access.store();

        let by_name = DocumentName::new(value.as_str());
        if store.document_exists("asset_type", &by_name)? {
            return Ok(by_name);
        }
        for (field, needle) in [
            ("asset_type_label", value.clone()),
            ("asset_type_code", value.to_lowercase()),
        ] {
            if !self.access.field_exists("asset_type", field) {
                continue;
            }
            if let Some(name) =
                store.find_by_field("asset_type", &FieldFilter::eq_ignore_case(field, needle))?
            {
                return Ok(name);
            }
        }

        // New types are named by slug, so separator variants land here.
        let code = slug_code(&value);
        let slug_name = DocumentName::new(code.as_str());
        if store.document_exists("asset_type", &slug_name)? {
            return Ok(slug_name);
        }

        let mut document = Document::with_name("asset_type", code.as_str());
        self.access
            .set_if_defined(&mut document, "asset_type_code", code.as_str());
        self.access
            .set_if_defined(&mut document, "asset_type_label", title_label(&value));
        match store.create_document(&document) {
            Ok(name) => {
                info!("event=asset_type_create module=service status=ok name={name}");
                Ok(name)
            }
            Err(StoreError::Conflict { name, .. }) => {
                info!("event=asset_type_create module=service status=conflict name={name}");
                Ok(name)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Creates one asset on an existing property.
    pub fn add_asset(&self, request: &NewAsset) -> ServiceResult<AssetRecord> {
        let property_name = required(
            request.property_name.as_deref(),
            "property_name is required",
        )?;
        let label = required(request.asset_label.as_deref(), "asset_label is required")?;
        let type_input = required(request.asset_type.as_deref(), "asset_type is required")?;
        let status = normalize_asset_status(request.asset_status.as_deref().unwrap_or(""));

        let property_name = DocumentName::new(property_name);
        let property = self
            .access
            .store()
            .get_document("property", &property_name)?
            .ok_or_else(|| ServiceError::NotFound {
                kind: "property".to_string(),
                name: property_name.to_string(),
            })?;
        let asset_type = self.ensure_asset_type(&type_input)?;

        let mut document = Document::new("asset")
            .with("asset_property", FieldValue::from(&property.name))
            .with("asset_type", FieldValue::from(&asset_type))
            .with("asset_label", label.as_str())
            .with("asset_status", status);
        let customer =
            self.access
                .get_optional(&property, "property_customer", FieldValue::Null);
        if !customer.is_blank() {
            self.access
                .set_if_defined(&mut document, "asset_customer", customer);
        }

        for (field, value) in [
            ("asset_make", &request.make),
            ("asset_model", &request.model),
            ("asset_serial", &request.serial),
            ("asset_identifier", &request.identifier),
            ("asset_standard", &request.standard),
            ("asset_zone", &request.zone_name),
            ("asset_location_level", &request.location_level),
            ("asset_location_area", &request.location_area),
            ("asset_location_riser", &request.location_riser),
            ("asset_location_cupboard", &request.location_cupboard),
            ("asset_location_room", &request.location_room),
            ("asset_location_notes", &request.location_notes),
        ] {
            if let Some(value) = optional(value.as_deref()) {
                self.access.set_if_defined(&mut document, field, value);
            }
        }

        if let Some(raw) = optional(request.install_date.as_deref()) {
            let when = parse_when(raw);
            match when.required_date.or(when.instant.map(|instant| instant.date())) {
                Some(date) => {
                    self.access
                        .set_if_defined(&mut document, "asset_install_date", date);
                }
                None => warn!(
                    "event=asset_create module=service status=skip field=asset_install_date reason=unparsable"
                ),
            }
        }

        let name = self.access.store().create_document(&document)?;
        info!("event=asset_create module=service status=ok name={name}");
        Ok(AssetRecord {
            name,
            label,
            status,
            asset_type,
            property: property.name,
        })
    }
}

/// Maps free-text status input onto the three canonical statuses.
///
/// Unknown input defaults to `Active`.
pub fn normalize_asset_status(raw: &str) -> &'static str {
    match raw.trim().to_lowercase().as_str() {
        "inactive" | "off" | "disable" | "disabled" => "Inactive",
        "decommissioned" | "decommission" | "decomm" | "retired" | "retire" => "Decommissioned",
        _ => "Active",
    }
}

/// Lowercase code with runs of non-alphanumerics collapsed to `_`.
pub fn slug_code(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let slug = NON_ALNUM_RE.replace_all(&lowered, "_");
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "type".to_string()
    } else {
        slug.to_string()
    }
}

/// Uppercases the first character only.
pub fn title_label(value: &str) -> String {
    let trimmed = value.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
