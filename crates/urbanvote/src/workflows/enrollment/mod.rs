//! Voter enrollment workflow: perimeter engine, step machine, and the
//! narrow contracts to the geocoding, validation, and submission
//! collaborators.

pub mod debounce;
pub mod draft;
pub mod geocode;
pub mod perimeter;
pub mod router;
pub mod service;
pub mod steps;
pub mod validation;

#[cfg(test)]
mod tests;

pub use draft::{
    AddressData, Declarations, EnrollmentCategory, EnrollmentDraft, FileSelection, Gender,
    PersonalData,
};
pub use geocode::{select_candidate, ForwardGeocoder, GeocodeCandidate, GeocodeError, ReverseGeocoder};
pub use perimeter::{Coordinate, Perimeter, PerimeterBounds, PerimeterError};
pub use router::enrollment_router;
pub use service::{
    EnrollmentRecord, EnrollmentRegistry, EnrollmentService, EnrollmentServiceError,
    EnrollmentStatus, RegistryError, ReviewDecision, StatusView,
};
pub use steps::{
    standard_steps, EnrollmentWizard, StepDescriptor, StepError, StepKind, StepState,
};
pub use validation::{
    national_id_checksum_ok, normalize_national_id, FieldError, FieldErrors, FormValidator,
    StandardFormValidator,
};
