//! Enrollment step machine: an ordered, configurable list of wizard steps,
//! each carrying its own validation predicate. Advancing is gated on the
//! current step's predicate; the address step additionally runs the
//! geofence check and may await a forward-geocoding lookup.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use super::draft::EnrollmentDraft;
use super::geocode::{select_candidate, ForwardGeocoder, GeocodeError, ReverseGeocoder};
use super::perimeter::{Coordinate, Perimeter};
use super::validation::{FieldError, FieldErrors, FormValidator, StandardFormValidator};

/// Tag selecting the predicate bound to a step. Adding, removing, or
/// reordering steps only touches the descriptor list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepKind {
    Category,
    Address,
    PersonalData,
    Documents,
    Review,
    Declarations,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepDescriptor {
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub kind: StepKind,
}

/// The standard deployment's step sequence.
pub fn standard_steps() -> Vec<StepDescriptor> {
    vec![
        StepDescriptor {
            key: "category_selection",
            title: "Enrollment Category",
            description: "Select how you participate in the program area",
            kind: StepKind::Category,
        },
        StepDescriptor {
            key: "address",
            title: "Address",
            description: "Provide your full address inside the coverage area",
            kind: StepKind::Address,
        },
        StepDescriptor {
            key: "personal_data",
            title: "Personal Data",
            description: "Provide your personal information",
            kind: StepKind::PersonalData,
        },
        StepDescriptor {
            key: "documents",
            title: "Documents",
            description: "Attach the required documents",
            kind: StepKind::Documents,
        },
        StepDescriptor {
            key: "review",
            title: "Review",
            description: "Review the submitted information",
            kind: StepKind::Review,
        },
        StepDescriptor {
            key: "declarations",
            title: "Declarations",
            description: "Accept the enrollment declarations",
            kind: StepKind::Declarations,
        },
    ]
}

/// Wizard navigation state. Created at mount, mutated only by advance and
/// retreat, discarded on submission or abandonment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepState {
    current: usize,
    completed: BTreeSet<usize>,
}

impl StepState {
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn completed(&self) -> &BTreeSet<usize> {
        &self.completed
    }

    pub fn is_completed(&self, index: usize) -> bool {
        self.completed.contains(&index)
    }

    fn mark_completed(&mut self, index: usize) {
        // BTreeSet makes re-marking a completed step a no-op.
        self.completed.insert(index);
    }
}

/// Step-level failure. Every variant is recoverable by the citizen; no
/// variant mutates `StepState`.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("{0}")]
    Validation(#[from] FieldErrors),
    #[error("select a location on the map before continuing")]
    MissingCoordinate,
    #[error("the selected address is outside the coverage area")]
    OutsidePerimeter,
    #[error("address lookup failed, please try again: {0}")]
    LookupFailed(#[from] GeocodeError),
}

/// The enrollment wizard: draft, navigation state, and collaborators.
///
/// One wizard per citizen session; nothing here is shared across sessions
/// except the read-only [`Perimeter`].
pub struct EnrollmentWizard<G, V = StandardFormValidator> {
    steps: Vec<StepDescriptor>,
    state: StepState,
    draft: EnrollmentDraft,
    perimeter: Arc<Perimeter>,
    geocoder: Arc<G>,
    validator: V,
}

impl<G> EnrollmentWizard<G, StandardFormValidator>
where
    G: ForwardGeocoder + ReverseGeocoder,
{
    pub fn new(perimeter: Arc<Perimeter>, geocoder: Arc<G>) -> Self {
        Self::with_steps(
            standard_steps(),
            perimeter,
            geocoder,
            StandardFormValidator::new(),
        )
    }
}

impl<G, V> EnrollmentWizard<G, V>
where
    G: ForwardGeocoder + ReverseGeocoder,
    V: FormValidator,
{
    /// Builds a wizard over a deployment-specific step list. The list must
    /// not be empty; the standard sequence lives in [`standard_steps`].
    pub fn with_steps(
        steps: Vec<StepDescriptor>,
        perimeter: Arc<Perimeter>,
        geocoder: Arc<G>,
        validator: V,
    ) -> Self {
        assert!(!steps.is_empty(), "wizard needs at least one step");
        Self {
            steps,
            state: StepState::default(),
            draft: EnrollmentDraft::default(),
            perimeter,
            geocoder,
            validator,
        }
    }

    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    pub fn state(&self) -> &StepState {
        &self.state
    }

    pub fn current_step(&self) -> &StepDescriptor {
        &self.steps[self.state.current]
    }

    pub fn draft(&self) -> &EnrollmentDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut EnrollmentDraft {
        &mut self.draft
    }

    pub fn perimeter(&self) -> &Perimeter {
        &self.perimeter
    }

    /// Consumes the wizard, handing the draft to the submission collaborator.
    pub fn into_draft(self) -> EnrollmentDraft {
        self.draft
    }

    /// Runs the current step's predicate. On success the step is marked
    /// completed (idempotently) and, unless this is the last step, the
    /// wizard moves forward. On failure state is left untouched.
    ///
    /// The address predicate may await a geocoding lookup. Dropping the
    /// future mid-lookup discards the pending result and leaves the wizard
    /// on the same step, ready for another attempt; callers hold `&mut
    /// self`, so overlapping calls cannot happen.
    pub async fn advance(&mut self) -> Result<(), StepError> {
        self.evaluate_current().await?;

        let current = self.state.current;
        self.state.mark_completed(current);
        if current + 1 < self.steps.len() {
            self.state.current = current + 1;
        }
        Ok(())
    }

    /// Moves back one step. Never fails and never un-marks completed steps;
    /// readiness re-checks every predicate live, so stale completions
    /// cannot leak into a submission.
    pub fn retreat(&mut self) {
        if self.state.current > 0 {
            self.state.current -= 1;
        }
    }

    /// Records a map click. The geofence check runs first; only a
    /// coordinate inside the perimeter triggers the reverse lookup that
    /// fills the textual fields. An outside coordinate clears the textual
    /// fields but stays on the draft so the marker remains visible.
    pub async fn place_marker(&mut self, latitude: f64, longitude: f64) -> Result<(), StepError> {
        let coordinate = Coordinate {
            latitude,
            longitude,
        };
        self.draft.address.coordinate = Some(coordinate);

        if !self.perimeter.contains_coordinate(coordinate) {
            self.draft.address.within_perimeter = Some(false);
            self.draft.address.clear_text_fields();
            return Err(StepError::OutsidePerimeter);
        }
        self.draft.address.within_perimeter = Some(true);

        if let Some(candidate) = self.geocoder.reverse(coordinate).await? {
            let address = &mut self.draft.address;
            address.street = candidate.street.unwrap_or_default();
            address.neighborhood = candidate.neighborhood.unwrap_or_default();
            address.city = candidate.city.unwrap_or_default();
            address.state = candidate.state.unwrap_or_default();
            address.postal_code = candidate.postal_code.unwrap_or_default();
            address.complement = None;
        }
        Ok(())
    }

    /// Synchronous live check of one step's predicate. Performs no lookups
    /// and never mutates the draft.
    pub fn check_step(&self, index: usize) -> bool {
        let Some(descriptor) = self.steps.get(index) else {
            return false;
        };
        evaluate_step_sync(
            descriptor.kind,
            &self.draft,
            &self.validator,
            &self.perimeter,
            today(),
        )
        .is_ok()
    }

    /// Submission gate: every step before the last must be completed AND
    /// every step's live predicate must currently hold. The live re-check
    /// covers drafts broken after their step was completed, e.g. an
    /// address moved outside the perimeter from the review screen.
    pub fn ready_to_submit(&self) -> bool {
        let last = self.steps.len() - 1;
        (0..last).all(|index| self.state.is_completed(index))
            && (0..=last).all(|index| self.check_step(index))
    }

    async fn evaluate_current(&mut self) -> Result<(), StepError> {
        let kind = self.steps[self.state.current].kind;
        match kind {
            StepKind::Address => self.evaluate_address().await,
            _ => evaluate_step_sync(kind, &self.draft, &self.validator, &self.perimeter, today()),
        }
    }

    async fn evaluate_address(&mut self) -> Result<(), StepError> {
        self.validator
            .validate_address_fields(&self.draft.address)?;

        let coordinate = match self.draft.address.coordinate {
            Some(coordinate) => coordinate,
            None => {
                // No map click yet: resolve from the textual address.
                let address = &self.draft.address;
                let query = format!(
                    "{}, {}, {}, {}",
                    address.street.trim(),
                    address.neighborhood.trim(),
                    address.city.trim(),
                    address.state.trim()
                );
                let candidates = self.geocoder.search(&query).await?;
                match select_candidate(candidates) {
                    Some(candidate) => {
                        self.draft.address.coordinate = Some(candidate.coordinate);
                        candidate.coordinate
                    }
                    None => return Err(StepError::MissingCoordinate),
                }
            }
        };

        if !self.perimeter.contains_coordinate(coordinate) {
            self.draft.address.within_perimeter = Some(false);
            self.draft.address.clear_text_fields();
            return Err(StepError::OutsidePerimeter);
        }

        self.draft.address.within_perimeter = Some(true);
        Ok(())
    }
}

/// Shared synchronous predicate evaluation; the service runs the same
/// checks over an assembled draft before accepting a submission.
pub(crate) fn evaluate_step_sync<V: FormValidator>(
    kind: StepKind,
    draft: &EnrollmentDraft,
    validator: &V,
    perimeter: &Perimeter,
    today: NaiveDate,
) -> Result<(), StepError> {
    match kind {
        StepKind::Category => validator.validate_category(draft)?,
        StepKind::Address => {
            validator.validate_address_fields(&draft.address)?;
            let coordinate = draft
                .address
                .coordinate
                .ok_or(StepError::MissingCoordinate)?;
            if !perimeter.contains_coordinate(coordinate) {
                return Err(StepError::OutsidePerimeter);
            }
        }
        StepKind::PersonalData => validator.validate_personal(draft, today)?,
        StepKind::Documents => validator.validate_files(&draft.files)?,
        StepKind::Review => {}
        StepKind::Declarations => {
            if !draft.declarations.all_accepted() {
                return Err(StepError::Validation(FieldErrors(vec![FieldError {
                    field: "declarations",
                    message: "all five declarations must be accepted".to_string(),
                }])));
            }
        }
    }
    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
