use crate::cli::ServeArgs;
use crate::error::AppError;
use crate::infra::{
    AppState, InMemoryApplicationRepository, InMemoryAuditTrail, InMemoryDocumentVault,
    PassthroughDirectory,
};
use crate::routes::with_loan_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lendflow::config::AppConfig;
use lendflow::telemetry;
use lendflow::workflows::loan::{
    LoanWorkflowService, RandomApplicationIds, RandomDisplayCodes, SystemClock,
};
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

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let vault = Arc::new(InMemoryDocumentVault::default());
    let trail = Arc::new(InMemoryAuditTrail::default());
    let directory = Arc::new(PassthroughDirectory);
    let workflow_service = Arc::new(LoanWorkflowService::new(
        repository,
        vault,
        trail,
        directory,
        Arc::new(RandomApplicationIds),
        Arc::new(RandomDisplayCodes::default()),
        Arc::new(SystemClock),
    ));

    let app = with_loan_routes(workflow_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "loan workflow service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
