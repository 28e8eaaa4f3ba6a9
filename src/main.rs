use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use testing_autologin::{
    api::{AppState, create_router},
    config::{EnvConfig, Settings},
    db::DbClient,
    middleware::{TESTING_USER_ENV, TestingAutoAuthenticator},
    repositories::{UserRepository, UserStore},
    services::UserService,
    sessions::SessionStore,
};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Command-line overrides for settings read from the environment.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Address to bind (overrides SERVER_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides SERVER_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Runtime environment name (overrides APP_ENV)
    #[arg(long = "env")]
    environment: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "testing_autologin=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut settings =
        Settings::from_env().map_err(|e| format!("Failed to load settings: {}", e))?;
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if let Some(environment) = cli.environment {
        settings.app.environment = environment;
    }

    tracing::info!(
        "Starting testing-autologin service in '{}' environment",
        settings.app.environment
    );

    let db_client = DbClient::new(&settings.scylla)
        .await
        .map_err(|e| format!("Failed to connect to ScyllaDB: {}", e))?;

    let users: Arc<dyn UserStore> = Arc::new(UserRepository::new(db_client));
    let auto_login = Arc::new(TestingAutoAuthenticator::new(
        Arc::new(EnvConfig::new(settings.app.environment.clone())),
        users.clone(),
    ));

    if let Some(user_id) = auto_login.armed_user_id() {
        tracing::warn!(
            "{} is set: unauthenticated requests will be logged in as '{}'",
            TESTING_USER_ENV,
            user_id
        );
    } else if settings.app.is_production() {
        tracing::debug!("Auto-login disabled in production");
    }

    let app_state = AppState {
        user_service: Arc::new(UserService::new(users)),
        sessions: SessionStore::with_limits(
            Duration::from_secs(settings.app.session_idle_timeout_secs),
            settings.app.max_sessions,
        ),
        auto_login,
    };

    // Build router
    let app = create_router(app_state).layer(
        ServiceBuilder::new()
            .layer(CatchPanicLayer::new())
            .layer(CorsLayer::permissive()),
    );

    // Start server
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut terminate_signal =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(err) = res {
                    tracing::error!("Failed to listen for Ctrl+C: {}", err);
                }
            },
            _ = terminate_signal.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
        }
    }

    tracing::info!("Shutdown signal received");
}
