/// Configuration management for Cart Service
///
/// Settings come from environment variables (plus `.env` in debug builds).
/// The identity-service connection settings are read by
/// [`AuthClientConfig::from_env`].
use anyhow::{bail, Context, Result};
use grpc_clients::AuthClientConfig;
use std::env;
use std::time::Duration;

pub const DEFAULT_WHITE_LIST: &str = "/health,/api/v1/docs/*";

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub auth: AuthClientConfig,
    /// Paths served without validation; see [`crate::middleware::WhiteList`]
    pub white_list: Vec<String>,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
    /// Budget for a whole inbound request, validation included
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn tls_required(&self) -> bool {
        matches!(
            self.env.to_ascii_lowercase().as_str(),
            "production" | "staging"
        )
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
        }

        let app = AppConfig {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: env::var("SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SERVICE_PORT")
                .unwrap_or_else(|_| "8082".to_string())
                .parse()
                .context("Invalid SERVICE_PORT")?,
            request_timeout: Duration::from_millis(
                env::var("HTTP_REQUEST_TIMEOUT_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .context("Invalid HTTP_REQUEST_TIMEOUT_MS")?,
            ),
        };

        let auth = AuthClientConfig::from_env().context("Invalid identity-service client settings")?;
        if app.tls_required() && auth.tls.is_none() {
            bail!("mTLS to identity-service is required in {} but no client certificates are configured", app.env);
        }

        let white_list = env::var("JWT_WHITE_LIST")
            .unwrap_or_else(|_| DEFAULT_WHITE_LIST.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            app,
            auth,
            white_list,
        })
    }
}
