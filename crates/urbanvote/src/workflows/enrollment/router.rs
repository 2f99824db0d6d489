use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::draft::EnrollmentDraft;
use super::service::{
    EnrollmentRegistry, EnrollmentService, EnrollmentServiceError, RegistryError, ReviewDecision,
};
use super::steps::StepError;
use super::validation::FormValidator;

/// Router builder exposing the enrollment endpoints: submission, public
/// status query, staff review, and the geofence pre-check for map clients.
pub fn enrollment_router<R, V>(service: Arc<EnrollmentService<R, V>>) -> Router
where
    R: EnrollmentRegistry + 'static,
    V: FormValidator + Send + Sync + 'static,
{
    Router::new()
        .route("/api/v1/enrollments", post(submit_handler::<R, V>))
        .route(
            "/api/v1/enrollments/:national_id/status",
            get(status_handler::<R, V>),
        )
        .route(
            "/api/v1/enrollments/:national_id/review",
            post(review_handler::<R, V>),
        )
        .route("/api/v1/geofence/check", post(geofence_handler::<R, V>))
        .with_state(service)
}

pub(crate) async fn submit_handler<R, V>(
    State(service): State<Arc<EnrollmentService<R, V>>>,
    axum::Json(draft): axum::Json<EnrollmentDraft>,
) -> Response
where
    R: EnrollmentRegistry + 'static,
    V: FormValidator + Send + Sync + 'static,
{
    match service.submit(draft) {
        Ok(record) => {
            let payload = json!({
                "national_id": record.draft.personal.national_id,
                "status": record.status.label(),
                "submitted_on": record.submitted_on,
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(error) => submission_error_response(error),
    }
}

fn submission_error_response(error: EnrollmentServiceError) -> Response {
    let status = match &error {
        EnrollmentServiceError::Step(StepError::OutsidePerimeter)
        | EnrollmentServiceError::Step(StepError::MissingCoordinate)
        | EnrollmentServiceError::Step(StepError::Validation(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EnrollmentServiceError::Step(StepError::LookupFailed(_)) => StatusCode::BAD_GATEWAY,
        EnrollmentServiceError::InvalidNationalId => StatusCode::BAD_REQUEST,
        EnrollmentServiceError::DuplicateEmail | EnrollmentServiceError::DuplicateNationalId => {
            StatusCode::CONFLICT
        }
        EnrollmentServiceError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn status_handler<R, V>(
    State(service): State<Arc<EnrollmentService<R, V>>>,
    Path(national_id): Path<String>,
) -> Response
where
    R: EnrollmentRegistry + 'static,
    V: FormValidator + Send + Sync + 'static,
{
    match service.status_by_national_id(&national_id) {
        Ok(Some(view)) => (StatusCode::OK, axum::Json(view)).into_response(),
        Ok(None) => {
            let payload = json!({ "found": false, "status": serde_json::Value::Null });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(EnrollmentServiceError::InvalidNationalId) => {
            let payload = json!({ "error": "national id must have 11 digits" });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    pub(crate) decision: ReviewDecision,
}

pub(crate) async fn review_handler<R, V>(
    State(service): State<Arc<EnrollmentService<R, V>>>,
    Path(national_id): Path<String>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    R: EnrollmentRegistry + 'static,
    V: FormValidator + Send + Sync + 'static,
{
    match service.review(&national_id, request.decision) {
        Ok(record) => {
            let payload = json!({
                "national_id": record.draft.personal.national_id,
                "status": record.status.label(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(EnrollmentServiceError::Registry(RegistryError::NotFound)) => {
            let payload = json!({ "error": "enrollment not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(EnrollmentServiceError::InvalidNationalId) => {
            let payload = json!({ "error": "national id must have 11 digits" });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeofenceCheckRequest {
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
}

pub(crate) async fn geofence_handler<R, V>(
    State(service): State<Arc<EnrollmentService<R, V>>>,
    axum::Json(request): axum::Json<GeofenceCheckRequest>,
) -> Response
where
    R: EnrollmentRegistry + 'static,
    V: FormValidator + Send + Sync + 'static,
{
    let perimeter = service.perimeter();
    let within = perimeter.contains(request.latitude, request.longitude);
    let payload = json!({
        "within_perimeter": within,
        "bounds": perimeter.bounds(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}
