/// Identity Service Main Entry Point
///
/// Starts the gRPC validation authority with:
/// - mTLS (mandatory in production/staging)
/// - PostgreSQL user directory (when DATABASE_URL is set)
use anyhow::{anyhow, Context, Result};
use grpc_tls::{MtlsServerConfig, PeerRole, TlsConfigPaths};
use identity_service::{
    config::Settings,
    security::{PgUserDirectory, UserDirectory},
    UserAuthService,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::signal;
use tonic::transport::Server;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23 requires selecting a CryptoProvider at runtime
    grpc_tls::install_crypto_provider();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "identity_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Identity Service");

    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    let codec = Arc::new(settings.jwt.build_codec()?);
    info!(
        lifetime_secs = codec.lifetime().num_seconds(),
        clock_skew_secs = codec.clock_skew().num_seconds(),
        "Token codec initialized"
    );

    let mut service = UserAuthService::new(codec);

    match &settings.database {
        Some(database) => {
            let db_pool = PgPoolOptions::new()
                .max_connections(database.max_connections)
                .acquire_timeout(database.acquire_timeout)
                .connect(&database.url)
                .await
                .context("Failed to connect to PostgreSQL")?;

            sqlx::migrate!("./migrations")
                .run(&db_pool)
                .await
                .context("Failed to run database migrations")?;
            info!(
                "Database pool initialized with {} max connections",
                database.max_connections
            );

            let directory: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(db_pool));
            service = service.with_directory(directory);
        }
        None => {
            info!("DATABASE_URL not set; tokens are validated without a subject lookup");
        }
    }

    let tls_config = match TlsConfigPaths::from_env_optional(PeerRole::Server) {
        Ok(Some(paths)) => {
            let cfg = MtlsServerConfig::from_paths(paths)
                .context("Failed to load gRPC server certificates")?;
            if !settings.server.expected_sans.is_empty() {
                cfg.require_sans(&settings.server.expected_sans)
                    .context("Server certificate does not cover GRPC_TLS_SERVER_NAMES")?;
            }
            info!("gRPC mTLS configuration loaded for identity-service");
            Some(cfg)
        }
        Ok(None) if settings.tls_required => {
            return Err(anyhow!(
                "TLS is required in production/staging but no certificates are configured"
            ));
        }
        Ok(None) => {
            warn!("TLS configuration missing - starting without TLS (development only)");
            None
        }
        Err(err) => {
            error!(error = %err, "Invalid gRPC TLS configuration");
            return Err(err.into());
        }
    };

    let mut server_builder = Server::builder();
    if let Some(cfg) = tls_config {
        server_builder = server_builder
            .tls_config(cfg.build_server_tls())
            .context("Failed to configure gRPC TLS")?;
    }

    let addr = settings.server.bind_address()?;
    info!("Starting gRPC server on {}", addr);

    server_builder
        .add_service(service.into_server())
        .serve_with_shutdown(addr, shutdown_signal())
        .await
        .context("gRPC server error")?;

    info!("Identity service shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
