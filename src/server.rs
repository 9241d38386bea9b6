use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_dashboard_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use onbid::auction::DashboardService;
use onbid::config::AppConfig;
use onbid::error::AppError;
use onbid::telemetry;
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
    args.data.apply(&mut config.dashboard);

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let app_state = AppState::new(prometheus_handle);
    let readiness_flag = app_state.readiness.clone();

    let service = Arc::new(DashboardService::new(config.dashboard.clone()));
    let app = with_dashboard_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        data_paths = ?config.dashboard.data_paths,
        tier_basis = ?config.dashboard.tier_basis,
        "onbid case dashboard ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
