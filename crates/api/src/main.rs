use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizdeck_api::auth::google::GoogleOAuth;
use quizdeck_api::auth::identity::IdentityProvider;
use quizdeck_api::background::{downgrade_sweep, generation_sweep};
use quizdeck_api::config::ServerConfig;
use quizdeck_api::router::build_app_router;
use quizdeck_api::state::AppState;
use quizdeck_generation::{GenerationApi, GenerationGateway};
use quizdeck_notify::{EmailConfig, LogMailer, Mailer, SmtpMailer};

/// Timeout for a single request to the generation service. The service
/// answers asynchronously, so this only covers accepting the job.
const GENERATION_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizdeck_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = connect_database().await;

    // --- Collaborators ---
    let mailer: Arc<dyn Mailer> = match EmailConfig::from_env() {
        Some(email) => {
            tracing::info!(host = %email.smtp_host, "SMTP mailer configured");
            Arc::new(SmtpMailer::new(email).expect("Invalid SMTP configuration"))
        }
        None => {
            tracing::warn!("EMAIL_HOST not set; emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let generation: Arc<dyn GenerationGateway> = Arc::new(
        GenerationApi::new(config.generation.api_url.clone(), GENERATION_REQUEST_TIMEOUT)
            .expect("Failed to build generation client"),
    );

    let identity: Option<Arc<dyn IdentityProvider>> = match config.google.clone() {
        Some(google) => Some(Arc::new(GoogleOAuth::new(google))),
        None => {
            tracing::warn!("Google OAuth not configured; sign-in routes are disabled");
            None
        }
    };

    // --- Background sweeps ---
    let cancel = CancellationToken::new();

    let downgrade_handle = tokio::spawn(downgrade_sweep::run(
        pool.clone(),
        Duration::from_secs(config.downgrade_sweep_interval_secs),
        cancel.clone(),
    ));
    let generation_handle = tokio::spawn(generation_sweep::run(
        pool.clone(),
        Arc::clone(&generation),
        config.generation.policy,
        Duration::from_secs(config.generation.sweep_interval_secs),
        cancel.clone(),
    ));
    tracing::info!("Background sweeps started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        mailer,
        generation,
        identity,
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

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    let _ = tokio::time::timeout(drain, downgrade_handle).await;
    let _ = tokio::time::timeout(drain, generation_handle).await;
    tracing::info!("Background sweeps stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Connect, verify and migrate. Any failure aborts startup.
async fn connect_database() -> quizdeck_db::DbPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = quizdeck_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    quizdeck_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    quizdeck_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready, migrations applied");
    pool
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
