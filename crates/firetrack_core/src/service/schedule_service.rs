//! Schedule rule and job use-cases.
//!
//! # Responsibility
//! - Create recurring schedule rules with a computed next occurrence.
//! - Create jobs whose "when" input is either an instant or a required date.
//!
//! # Invariants
//! - A rule is stored only after property, frequency and anchor are present
//!   and the property exists.
//! - An unknown frequency is stored as given with no next occurrence.
//! - A job carries at most one of `job_scheduled_start`/`job_required_date`.

use super::{optional, required, ServiceError, ServiceResult};
use crate::access::SchemaAccessor;
use crate::model::document::{Document, DocumentName, FieldValue};
use crate::repo::document_repo::DocumentStore;
use crate::schedule::recurrence::{next_from_anchor, parse_when, When};
use crate::schema::SchemaMetadata;
use chrono::NaiveDateTime;
use log::info;

const DEFAULT_JOB_STATUS: &str = "Scheduled";

/// Input for [`ScheduleService::add_schedule_rule`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewScheduleRule {
    pub property_name: Option<String>,
    pub frequency: Option<String>,
    pub anchor_date: Option<String>,
    pub contract_name: Option<String>,
    pub timezone: Option<String>,
    pub rrule: Option<String>,
}

/// Created schedule rule summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRuleRecord {
    pub name: DocumentName,
    pub frequency: String,
    pub next_occurrence: Option<NaiveDateTime>,
}

/// Input for [`ScheduleService::add_job`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewJob {
    pub property_name: Option<String>,
    pub title: Option<String>,
    pub when: Option<String>,
    pub status: Option<String>,
}

/// Created job summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub name: DocumentName,
    pub title: String,
    pub status: String,
    pub when: When,
}

pub struct ScheduleService<M, S> {
    access: SchemaAccessor<M, S>,
}

impl<M: SchemaMetadata, S: DocumentStore> ScheduleService<M, S> {
    pub fn new(access: SchemaAccessor<M, S>) -> Self {
        Self { access }
    }

    pub fn access(&self) -> &SchemaAccessor<M, S> {
        &self.access
    }

    /// Creates a recurring rule for a property.
    pub fn add_schedule_rule(&self, request: &NewScheduleRule) -> ServiceResult<ScheduleRuleRecord> {
        let missing = "property_name, frequency and anchor_date are required";
        let property_name = required(request.property_name.as_deref(), missing)?;
        let frequency = required(request.frequency.as_deref(), missing)?;
        let anchor_date = required(request.anchor_date.as_deref(), missing)?;

        let property = self.existing("property", &property_name)?;
        let next_occurrence = next_from_anchor(Some(anchor_date.as_str()), Some(frequency.as_str()));

        let mut document = Document::new("schedule_rule")
            .with("schedule_rule_property", FieldValue::from(&property))
            .with("schedule_rule_frequency", frequency.as_str())
            .with("schedule_rule_anchor_date", anchor_date.as_str())
            .with("schedule_rule_next_occurrence", next_occurrence);
        for (field, value) in [
            ("schedule_rule_contract", &request.contract_name),
            ("schedule_rule_timezone", &request.timezone),
            ("schedule_rule_rrule", &request.rrule),
        ] {
            if let Some(value) = optional(value.as_deref()) {
                self.access.set_if_defined(&mut document, field, value);
            }
        }

        let name = self.access.store().create_document(&document)?;
        info!(
            "event=schedule_rule_create module=service status=ok name={name} frequency={frequency} has_next={}",
            next_occurrence.is_some()
        );
        Ok(ScheduleRuleRecord {
            name,
            frequency,
            next_occurrence,
        })
    }

    /// Creates a job on a property.
    ///
    /// A full date-time `when` fills `job_scheduled_start`; a bare date fills
    /// `job_required_date`; anything else leaves the job unscheduled.
    pub fn add_job(&self, request: &NewJob) -> ServiceResult<JobRecord> {
        let missing = "property_name and title are required";
        let property_name = required(request.property_name.as_deref(), missing)?;
        let title = required(request.title.as_deref(), missing)?;
        let status = optional(request.status.as_deref())
            .unwrap_or(DEFAULT_JOB_STATUS)
            .to_string();

        let property = self.existing("property", &property_name)?;
        let when = request
            .when
            .as_deref()
            .map(parse_when)
            .unwrap_or_default();

        let mut document = Document::new("job")
            .with("job_property", FieldValue::from(&property))
            .with("job_title", title.as_str())
            .with("job_status", status.as_str());
        if let Some(instant) = when.instant {
            self.access
                .set_if_defined(&mut document, "job_scheduled_start", instant);
        }
        if let Some(date) = when.required_date {
            self.access
                .set_if_defined(&mut document, "job_required_date", date);
        }

        let name = self.access.store().create_document(&document)?;
        info!(
            "event=job_create module=service status=ok name={name} scheduled={}",
            !when.is_empty()
        );
        Ok(JobRecord {
            name,
            title,
            status,
            when,
        })
    }

    fn existing(&self, kind: &str, name: &str) -> ServiceResult<DocumentName> {
        let name = DocumentName::new(name);
        if self.access.store().document_exists(kind, &name)? {
            return Ok(name);
        }
        Err(ServiceError::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        })
    }
}
