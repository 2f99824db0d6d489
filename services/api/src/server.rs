use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryEnrollmentRegistry};
use crate::routes::with_enrollment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use urbanvote::config::AppConfig;
use urbanvote::error::AppError;
use urbanvote::telemetry;
use urbanvote::workflows::enrollment::perimeter::Perimeter;
use urbanvote::workflows::enrollment::service::EnrollmentService;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    // The perimeter is loaded before the listener binds; a service that
    // cannot answer the geofence question must not accept traffic.
    let perimeter = Arc::new(Perimeter::load(&config.perimeter)?);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let registry = Arc::new(InMemoryEnrollmentRegistry::default());
    let enrollment_service = Arc::new(EnrollmentService::new(registry, perimeter));

    let app = with_enrollment_routes(enrollment_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "voter enrollment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
