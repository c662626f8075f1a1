/// gRPC Configuration
///
/// Endpoint, timeout and mTLS settings for the identity-service channel.
use anyhow::{Context, Result};
use grpc_tls::{MtlsClientConfig, PeerRole, TlsConfigPaths};
use std::env;
use std::time::Duration;
use tonic::transport::Endpoint;

pub const DEFAULT_IDENTITY_SERVICE_URL: &str = "https://identity-service:50051";
pub const DEFAULT_TLS_DOMAIN_NAME: &str = "identity-service";

#[derive(Debug, Clone)]
pub struct AuthClientConfig {
    /// identity-service endpoint
    pub identity_service_url: String,

    /// TCP + TLS connect timeout
    pub connection_timeout: Duration,

    /// Upper bound on a single ValidateToken call
    pub request_timeout: Duration,

    /// HTTP/2 keep-alive interval
    pub keepalive_interval: Duration,

    /// HTTP/2 keep-alive timeout
    pub keepalive_timeout: Duration,

    /// Number of independent HTTP/2 connections
    pub connection_pool_size: usize,

    /// Client certificate material; `None` means plaintext (development only)
    pub tls: Option<MtlsClientConfig>,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{name} must be a valid number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl AuthClientConfig {
    /// Load configuration from environment variables
    ///
    /// - `GRPC_IDENTITY_SERVICE_URL` (default `https://identity-service:50051`)
    /// - `GRPC_CONNECTION_TIMEOUT_MS` (default 2000)
    /// - `GRPC_REQUEST_TIMEOUT_MS` (default 1500)
    /// - `GRPC_KEEPALIVE_INTERVAL_SECS` / `GRPC_KEEPALIVE_TIMEOUT_SECS` (30 / 10)
    /// - `GRPC_CONNECTION_POOL_SIZE` (default 2)
    /// - `GRPC_CA_CERT_PATH`, `GRPC_CLIENT_CERT_PATH`, `GRPC_CLIENT_KEY_PATH`
    /// - `GRPC_TLS_DOMAIN_NAME` (default `identity-service`)
    pub fn from_env() -> Result<Self> {
        let tls = match TlsConfigPaths::from_env_optional(PeerRole::Client)
            .context("Invalid gRPC client TLS configuration")?
        {
            Some(paths) => {
                let domain = env::var("GRPC_TLS_DOMAIN_NAME")
                    .unwrap_or_else(|_| DEFAULT_TLS_DOMAIN_NAME.to_string());
                Some(
                    MtlsClientConfig::from_paths(paths, domain)
                        .context("Failed to load gRPC client certificates")?,
                )
            }
            None => None,
        };

        let connection_pool_size: usize = env_parse("GRPC_CONNECTION_POOL_SIZE", 2)?;
        if connection_pool_size == 0 {
            anyhow::bail!("GRPC_CONNECTION_POOL_SIZE must be at least 1");
        }

        Ok(Self {
            identity_service_url: env::var("GRPC_IDENTITY_SERVICE_URL")
                .unwrap_or_else(|_| DEFAULT_IDENTITY_SERVICE_URL.to_string()),
            connection_timeout: Duration::from_millis(env_parse("GRPC_CONNECTION_TIMEOUT_MS", 2000)?),
            request_timeout: Duration::from_millis(env_parse("GRPC_REQUEST_TIMEOUT_MS", 1500)?),
            keepalive_interval: Duration::from_secs(env_parse("GRPC_KEEPALIVE_INTERVAL_SECS", 30)?),
            keepalive_timeout: Duration::from_secs(env_parse("GRPC_KEEPALIVE_TIMEOUT_SECS", 10)?),
            connection_pool_size,
            tls,
        })
    }

    /// Configuration for development/testing against a local plaintext server
    pub fn development(identity_service_url: impl Into<String>) -> Self {
        Self {
            identity_service_url: identity_service_url.into(),
            connection_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_millis(1500),
            keepalive_interval: Duration::from_secs(30),
            keepalive_timeout: Duration::from_secs(10),
            connection_pool_size: 2,
            tls: None,
        }
    }

    pub fn with_tls(mut self, tls: MtlsClientConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Build a tonic Endpoint with timeouts, keepalive and optional mTLS
    ///
    /// With TLS configured an `http://` URL is upgraded to `https://`.
    pub fn make_endpoint(&self) -> Result<Endpoint, tonic::transport::Error> {
        let url = match (&self.tls, self.identity_service_url.strip_prefix("http://")) {
            (Some(_), Some(rest)) => format!("https://{rest}"),
            _ => self.identity_service_url.clone(),
        };

        let ep = Endpoint::from_shared(url)?
            .connect_timeout(self.connection_timeout)
            .http2_keep_alive_interval(self.keepalive_interval)
            .keep_alive_timeout(self.keepalive_timeout)
            .keep_alive_while_idle(true)
            .tcp_nodelay(true);

        match &self.tls {
            Some(tls) => ep.tls_config(tls.build_client_tls()),
            None => Ok(ep),
        }
    }
}
