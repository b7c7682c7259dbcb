use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use genesis_fal::FalClient;
use genesis_pipeline::{JobOrchestrator, JobStore, OpenAiEnhancer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genesis_api::config::ServerConfig;
use genesis_api::middleware::rate_limit::RateLimiter;
use genesis_api::router::build_app_router;
use genesis_api::state::AppState;

/// How long in-flight runs get to record their final state on shutdown.
const RUN_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "genesis_api=debug,genesis_pipeline=debug,genesis_fal=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Directories ---
    for dir in [&config.output_dir, &config.uploads_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .unwrap_or_else(|e| panic!("Failed to create directory {}: {e}", dir.display()));
        tracing::info!(path = %dir.display(), "Directory ready");
    }

    // --- Database ---
    let pool = genesis_db::create_pool(&config.database_url)
        .await
        .expect("Failed to open job database");
    tracing::info!("Database connection pool created");

    genesis_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    genesis_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Job pipeline ---
    let client = Arc::new(FalClient::new(config.fal_config()));
    let enhancer = Arc::new(OpenAiEnhancer::new(
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    ));
    let store = Arc::new(JobStore::new(&config.output_dir, Some(pool.clone())));
    let orchestrator = JobOrchestrator::new(store, client, enhancer, config.orchestrator_config());

    tracing::info!(
        fal_configured = orchestrator.generation_available(),
        enhancement_configured = orchestrator.enhancement_available(),
        model = %config.fal_model_id,
        "Job pipeline ready",
    );

    // --- App state ---
    let state = AppState {
        pool: Some(pool),
        config: Arc::new(config.clone()),
        orchestrator: orchestrator.clone(),
        rate_limiter: Arc::new(RateLimiter::new(
            config.rate_limit_max,
            Duration::from_secs(config.rate_limit_window_secs),
        )),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cancelling running jobs");
    if tokio::time::timeout(RUN_DRAIN_TIMEOUT, orchestrator.shutdown())
        .await
        .is_err()
    {
        tracing::warn!("Timed out waiting for job runs to stop");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
