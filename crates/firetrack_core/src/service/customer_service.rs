//! Customer resolution use-cases.
//!
//! # Responsibility
//! - Resolve customers by id or display name.
//! - Create customers on demand with install-appropriate group/territory.
//!
//! # Invariants
//! - `ensure_customer` never creates a second customer for the same name
//!   when called sequentially.
//! - Group/territory defaults never block creation; the root literal is the
//!   last resort.

use super::{required, ServiceResult};
use crate::access::{FallbackChain, SchemaAccessor};
use crate::db::seed::{ROOT_CUSTOMER_GROUP, ROOT_TERRITORY};
use crate::model::document::{DocumentName, FieldValue};
use crate::repo::document_repo::{DocumentStore, FieldFilter, StoreError};
use crate::schema::SchemaMetadata;

/// Natural keys of `customer`, in lookup order.
pub const CUSTOMER_KEYS: &[&str] = &["name", "customer_name"];

const DEFAULT_CUSTOMER_TYPE: &str = "Company";

pub struct CustomerService<M, S> {
    access: SchemaAccessor<M, S>,
}

impl<M: SchemaMetadata, S: DocumentStore> CustomerService<M, S> {
    pub fn new(access: SchemaAccessor<M, S>) -> Self {
        Self { access }
    }

    pub fn access(&self) -> &SchemaAccessor<M, S> {
        &self.access
    }

    /// Finds a customer by exact id, else by `customer_name`.
    pub fn find_customer(&self, name_or_title: &str) -> ServiceResult<Option<DocumentName>> {
        Ok(self
            .access
            .resolve_link_target("customer", CUSTOMER_KEYS, name_or_title)?)
    }

    /// Returns the customer called `customer_name`, creating it if needed.
    ///
    /// Group and territory defaults are looked up only on the create path.
    pub fn ensure_customer(&self, customer_name: &str) -> ServiceResult<DocumentName> {
        let customer_name = required(Some(customer_name), "Customer name required")?;
        if let Some(existing) = self.find_customer(&customer_name)? {
            return Ok(existing);
        }

        let defaults = [
            (
                "customer_group",
                FieldValue::from(self.default_group("customer_group", ROOT_CUSTOMER_GROUP)),
            ),
            (
                "territory",
                FieldValue::from(self.default_group("territory", ROOT_TERRITORY)),
            ),
            ("customer_type", FieldValue::from(DEFAULT_CUSTOMER_TYPE)),
        ];
        Ok(self
            .access
            .ensure_document("customer", CUSTOMER_KEYS, &customer_name, &defaults)?)
    }

    /// Default customer group for new customers.
    pub fn default_customer_group(&self) -> String {
        self.default_group("customer_group", ROOT_CUSTOMER_GROUP)
    }

    /// Default territory for new customers.
    pub fn default_territory(&self) -> String {
        self.default_group("territory", ROOT_TERRITORY)
    }

    /// Root group if present, else the first non-group entry (only when the
    /// kind defines `is_group`), else the root literal.
    fn default_group(&self, kind: &'static str, root: &'static str) -> String {
        let store = self.access.store();
        FallbackChain::<String, StoreError>::new(kind)
            .then("root", || {
                let root_name = DocumentName::new(root);
                Ok(store
                    .document_exists(kind, &root_name)?
                    .then(|| root.to_string()))
            })
            .then("first_leaf", || {
                if !self.access.field_exists(kind, "is_group") {
                    return Ok(None);
                }
                Ok(store
                    .find_by_field(kind, &FieldFilter::eq("is_group", false))?
                    .map(|name| name.to_string()))
            })
            .resolve_or_else(|| root.to_string())
    }
}
