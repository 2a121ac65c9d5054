use api::middleware::log_request;
use api::routes::routes;
use api::state::AppState;
use axum::{Router, middleware::from_fn};
use chrono::Utc;
use db::connect;
use migration::Migrator;
use sea_orm_migration::MigratorTrait;
use services::face::{FaceVerifier, HttpFaceVerifier};
use services::scheduler::PeriodicJob;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_appender::rolling;
use util::config;

#[tokio::main]
async fn main() {
    // Load configuration and initialize logging
    let _log_guard = init_logging(&config::log_file(), &config::log_level());

    let db = connect().await.expect("Failed to connect to database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to apply migrations");

    let verifier = HttpFaceVerifier::from_config()
        .expect("Failed to build face verification client")
        .map(|v| Arc::new(v) as Arc<dyn FaceVerifier>);
    if verifier.is_none() {
        info!("FACE_VERIFICATION_URL not set, facial verification checks will fail closed");
    }

    let app_state = AppState::new(db, verifier);

    spawn_lifecycle_jobs(&app_state);

    let cors = CorsLayer::very_permissive();

    let app = Router::new()
        .nest("/api", routes(app_state))
        .layer(from_fn(log_request))
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", config::host(), config::port())
        .parse()
        .expect("Invalid address");

    info!(
        "Starting {} on http://{}:{}",
        config::project_name(),
        config::host(),
        config::port()
    );

    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server crashed");
}

fn init_logging(log_file: &str, log_level: &str) -> tracing_appender::non_blocking::WorkerGuard {
    use std::fs;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    fs::create_dir_all("logs").ok();

    let file_appender = rolling::daily("logs", log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(true)
        .with_thread_ids(true);

    let env_filter = EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| EnvFilter::new("api=info,services=info"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    if config::log_to_stdout() {
        registry.with(stdout_layer).init();
    } else {
        registry.init();
    }

    guard
}

/// Starts the status and finalization sweeps on their configured intervals.
fn spawn_lifecycle_jobs(app_state: &AppState) {
    let lifecycle = app_state.lifecycle().clone();
    PeriodicJob::new(
        "status-sweep",
        Duration::from_secs(config::status_sweep_seconds()),
    )
    .spawn(move || {
        let lifecycle = lifecycle.clone();
        async move {
            match lifecycle.sweep_statuses(Utc::now()).await {
                Ok(report) if report.advanced > 0 || report.failed > 0 => info!(
                    examined = report.examined,
                    advanced = report.advanced,
                    failed = report.failed,
                    "Status sweep finished"
                ),
                Ok(_) => {}
                Err(e) => error!(error = %e, "Status sweep failed"),
            }
        }
    });

    let lifecycle = app_state.lifecycle().clone();
    PeriodicJob::new(
        "finalize-sweep",
        Duration::from_secs(config::finalize_sweep_seconds()),
    )
    .spawn(move || {
        let lifecycle = lifecycle.clone();
        async move {
            match lifecycle.sweep_finalizations(Utc::now()).await {
                Ok(report) if report.examined > 0 => info!(
                    examined = report.examined,
                    finalized = report.finalized,
                    deferred = report.deferred,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Finalization sweep finished"
                ),
                Ok(_) => {}
                Err(e) => error!(error = %e, "Finalization sweep failed"),
            }
        }
    });
}
