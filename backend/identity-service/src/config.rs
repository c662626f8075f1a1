//! Configuration management for Identity Service
//!
//! Loads settings from environment variables, with a `.env` file picked up
//! in debug builds.
//!
//! # Example
//!
//! ```no_run
//! use identity_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let codec = settings.jwt.build_codec()?;
//!     println!("tokens live for {}s", codec.lifetime().num_seconds());
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use crypto_core::jwt::{TokenCodec, DEFAULT_CLOCK_SKEW_SECONDS};
use std::env;
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub jwt: JwtSettings,
    pub server: ServerSettings,
    /// `None` runs the authority without a user directory (stateless).
    pub database: Option<DatabaseSettings>,
    /// Refuse to start without mTLS material.
    pub tls_required: bool,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) && dotenvy::dotenv().is_ok() {
            info!("Loaded .env file for development");
        }

        Ok(Settings {
            jwt: JwtSettings::from_env()?,
            server: ServerSettings::from_env()?,
            database: DatabaseSettings::from_env()?,
            tls_required: tls_required_for(
                &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            ),
        })
    }
}

/// Production and staging never run plaintext.
pub fn tls_required_for(app_env: &str) -> bool {
    matches!(
        app_env.to_ascii_lowercase().as_str(),
        "production" | "staging"
    )
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("Invalid {name}")),
        Err(_) => Ok(default),
    }
}

/// JWT signing settings
#[derive(Clone)]
pub struct JwtSettings {
    secret: String,
    pub expiry_seconds: i64,
    pub clock_skew_seconds: i64,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("expiry_seconds", &self.expiry_seconds)
            .field("clock_skew_seconds", &self.clock_skew_seconds)
            .finish()
    }
}

impl JwtSettings {
    pub fn new(secret: impl Into<String>, expiry_seconds: i64, clock_skew_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            expiry_seconds,
            clock_skew_seconds,
        }
    }

    fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        Ok(Self {
            secret,
            expiry_seconds: parse_or("JWT_EXPIRY_SECONDS", 3600)?,
            clock_skew_seconds: parse_or("JWT_CLOCK_SKEW_SECONDS", DEFAULT_CLOCK_SKEW_SECONDS)?,
        })
    }

    /// Build the codec; rejects short secrets and out-of-range durations.
    pub fn build_codec(&self) -> Result<TokenCodec> {
        let lifetime = chrono::Duration::try_seconds(self.expiry_seconds)
            .context("Invalid JWT_EXPIRY_SECONDS")?;
        let clock_skew = chrono::Duration::try_seconds(self.clock_skew_seconds)
            .context("Invalid JWT_CLOCK_SKEW_SECONDS")?;

        let codec = TokenCodec::new(self.secret.as_bytes(), lifetime)
            .context("Invalid JWT settings")?
            .with_clock_skew(clock_skew)
            .context("Invalid JWT_CLOCK_SKEW_SECONDS")?;
        Ok(codec)
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Names the server certificate must cover, from `GRPC_TLS_SERVER_NAMES`.
    pub expected_sans: Vec<String>,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        let expected_sans = env::var("GRPC_TLS_SERVER_NAMES")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("GRPC_PORT", 50051)?,
            expected_sans,
        })
    }

    pub fn bind_address(&self) -> Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .context("Invalid server address")
    }
}

/// Database connection settings
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseSettings {
    fn from_env() -> Result<Option<Self>> {
        let Ok(url) = env::var("DATABASE_URL") else {
            return Ok(None);
        };

        Ok(Some(Self {
            url,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            acquire_timeout: Duration::from_secs(parse_or("DATABASE_ACQUIRE_TIMEOUT", 5)?),
        }))
    }
}
