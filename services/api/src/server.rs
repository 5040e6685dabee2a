use crate::cli::ServeArgs;
use crate::infra::{build_boarding_service, AppState};
use crate::routes::with_boarding_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use kennel_desk::config::AppConfig;
use kennel_desk::error::AppError;
use kennel_desk::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let boarding_service = build_boarding_service(&config.boarding)?;

    let app = with_boarding_routes(boarding_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, kennels = config.boarding.kennel_count, "kennel desk ready");

    axum::serve(listener, app).await?;
    Ok(())
}
