use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::draft::EnrollmentDraft;
use super::perimeter::Perimeter;
use super::steps::{evaluate_step_sync, standard_steps, StepError};
use super::validation::{normalize_national_id, FormValidator, StandardFormValidator};

/// Review lifecycle of a stored enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentStatus {
    UnderReview,
    Approved,
    Rejected,
}

impl EnrollmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EnrollmentStatus::UnderReview => "under_review",
            EnrollmentStatus::Approved => "approved",
            EnrollmentStatus::Rejected => "rejected",
        }
    }
}

/// Staff decision applied to a record under review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// Registry record: the normalized draft plus review metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub draft: EnrollmentDraft,
    pub status: EnrollmentStatus,
    pub submitted_on: chrono::NaiveDate,
}

/// Storage abstraction so the service can be exercised in isolation.
/// Records are keyed by the normalized (digits-only) national id.
pub trait EnrollmentRegistry: Send + Sync {
    fn insert(&self, record: EnrollmentRecord) -> Result<EnrollmentRecord, RegistryError>;
    fn fetch_by_national_id(
        &self,
        national_id: &str,
    ) -> Result<Option<EnrollmentRecord>, RegistryError>;
    fn fetch_by_email(&self, email: &str) -> Result<Option<EnrollmentRecord>, RegistryError>;
    fn update_status(
        &self,
        national_id: &str,
        status: EnrollmentStatus,
    ) -> Result<(), RegistryError>;
}

/// Error enumeration for registry failures.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Public status view returned by the national-id query.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub found: bool,
    pub name: Option<String>,
    pub status: Option<&'static str>,
}

/// Error raised by the enrollment service.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentServiceError {
    #[error(transparent)]
    Step(#[from] StepError),
    #[error("email already enrolled")]
    DuplicateEmail,
    #[error("national id already enrolled")]
    DuplicateNationalId,
    #[error("national id must have 11 digits")]
    InvalidNationalId,
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Submission collaborator: re-validates assembled drafts server-side,
/// rejects duplicates, stores records, and answers the public status query.
pub struct EnrollmentService<R, V = StandardFormValidator> {
    registry: Arc<R>,
    perimeter: Arc<Perimeter>,
    validator: V,
}

impl<R> EnrollmentService<R, StandardFormValidator>
where
    R: EnrollmentRegistry + 'static,
{
    pub fn new(registry: Arc<R>, perimeter: Arc<Perimeter>) -> Self {
        Self::with_validator(registry, perimeter, StandardFormValidator::new())
    }
}

impl<R, V> EnrollmentService<R, V>
where
    R: EnrollmentRegistry + 'static,
    V: FormValidator,
{
    pub fn with_validator(registry: Arc<R>, perimeter: Arc<Perimeter>, validator: V) -> Self {
        Self {
            registry,
            perimeter,
            validator,
        }
    }

    pub fn perimeter(&self) -> &Arc<Perimeter> {
        &self.perimeter
    }

    /// Accepts an assembled draft that reached the wizard's terminal state.
    /// Every step predicate is re-run here; a client cannot smuggle an
    /// invalid or out-of-area draft past the wizard.
    pub fn submit(
        &self,
        mut draft: EnrollmentDraft,
    ) -> Result<EnrollmentRecord, EnrollmentServiceError> {
        let today = Local::now().date_naive();
        for descriptor in standard_steps() {
            evaluate_step_sync(
                descriptor.kind,
                &draft,
                &self.validator,
                &self.perimeter,
                today,
            )?;
        }

        draft.personal.email = draft.personal.email.trim().to_lowercase();
        draft.personal.national_id = normalize_national_id(&draft.personal.national_id);

        if self
            .registry
            .fetch_by_email(&draft.personal.email)?
            .is_some()
        {
            return Err(EnrollmentServiceError::DuplicateEmail);
        }
        if self
            .registry
            .fetch_by_national_id(&draft.personal.national_id)?
            .is_some()
        {
            return Err(EnrollmentServiceError::DuplicateNationalId);
        }

        let record = EnrollmentRecord {
            draft,
            status: EnrollmentStatus::UnderReview,
            submitted_on: today,
        };
        let stored = self.registry.insert(record)?;
        tracing::info!(
            category = ?stored.draft.category,
            submitted_on = %stored.submitted_on,
            "enrollment stored for review"
        );
        Ok(stored)
    }

    /// Public status query by national id. Malformed ids are rejected
    /// before touching the registry; an unknown id is `Ok(None)`.
    pub fn status_by_national_id(
        &self,
        raw: &str,
    ) -> Result<Option<StatusView>, EnrollmentServiceError> {
        let national_id = normalize_national_id(raw);
        if national_id.len() != 11 {
            return Err(EnrollmentServiceError::InvalidNationalId);
        }

        let record = self.registry.fetch_by_national_id(&national_id)?;
        Ok(record.map(|record| StatusView {
            found: true,
            name: Some(record.draft.personal.full_name.clone()),
            status: Some(record.status.label()),
        }))
    }

    /// Staff review: moves a stored record to approved or rejected.
    pub fn review(
        &self,
        raw_national_id: &str,
        decision: ReviewDecision,
    ) -> Result<EnrollmentRecord, EnrollmentServiceError> {
        let national_id = normalize_national_id(raw_national_id);
        if national_id.len() != 11 {
            return Err(EnrollmentServiceError::InvalidNationalId);
        }

        let status = match decision {
            ReviewDecision::Approve => EnrollmentStatus::Approved,
            ReviewDecision::Reject => EnrollmentStatus::Rejected,
        };
        self.registry.update_status(&national_id, status)?;
        tracing::info!(status = status.label(), "enrollment review recorded");

        let record = self
            .registry
            .fetch_by_national_id(&national_id)?
            .ok_or(RegistryError::NotFound)?;
        Ok(record)
    }
}
