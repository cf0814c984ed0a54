use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_rental_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rental_hub::config::AppConfig;
use rental_hub::error::AppError;
use rental_hub::rentals::{
    InMemoryBlobStore, InMemoryRentalStore, QueuedNotifier, RentalService, SystemClock,
};
use rental_hub::telemetry;
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryRentalStore::new());
    let (notifier, worker) = QueuedNotifier::spawn(
        store.clone(),
        Arc::new(SystemClock),
        config.notifications.queue_capacity,
    );
    let rental_service = Arc::new(RentalService::new(
        store,
        Arc::new(notifier),
        Arc::new(InMemoryBlobStore::default()),
    ));

    let app = with_rental_routes(rental_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        queue_capacity = config.notifications.queue_capacity,
        "rental hub ready"
    );

    axum::serve(listener, app).await?;

    let delivered = worker.join().await;
    info!(delivered, "notification queue drained");
    Ok(())
}
