use actix_web::{middleware::Logger, App, HttpServer};
use anyhow::{Context, Result};
use cart_service::config::Config;
use cart_service::handlers;
use cart_service::middleware::{GrpcAuthMiddleware, WhiteList};
use grpc_clients::AuthClient;
use std::sync::Arc;
use tracing::{info, warn};

#[actix_web::main]
async fn main() -> Result<()> {
    // rustls 0.23 requires selecting a CryptoProvider at runtime
    grpc_tls::install_crypto_provider();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "cart_service=info,actix_web=info".into()),
        )
        .with_target(false)
        .json()
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    if config.auth.tls.is_none() {
        warn!("identity-service client TLS not configured - plaintext gRPC (development only)");
    }

    // Channels connect lazily; the service starts even if identity-service is down.
    let client = Arc::new(
        AuthClient::new(&config.auth).context("Invalid identity-service endpoint")?,
    );
    let white_list = WhiteList::new(&config.white_list).context("Invalid JWT_WHITE_LIST pattern")?;
    let auth = GrpcAuthMiddleware::new(client, white_list, config.app.request_timeout);

    info!(
        host = %config.app.host,
        port = config.app.port,
        identity_service = %config.auth.identity_service_url,
        "Starting cart-service"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(auth.clone())
            .wrap(Logger::default())
            .configure(handlers::configure)
    })
    .bind((config.app.host.as_str(), config.app.port))
    .with_context(|| format!("Failed to bind {}:{}", config.app.host, config.app.port))?
    .run()
    .await
    .context("HTTP server error")?;

    info!("cart-service shutdown complete");
    Ok(())
}
