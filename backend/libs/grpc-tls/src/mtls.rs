//! mTLS configuration for the identity boundary
//!
//! - Server side: presents its certificate and *requires* a client certificate
//!   chained to the deployment CA (tonic rejects the handshake otherwise)
//! - Client side: trusts only the deployment CA and presents its own certificate
//! - Certificates are checked for expiry on load
//!
//! ## Usage
//!
//! ```rust,no_run
//! use grpc_tls::mtls::{MtlsServerConfig, PeerRole, TlsConfigPaths};
//!
//! # fn example() -> grpc_tls::TlsResult<()> {
//! let paths = TlsConfigPaths::from_env(PeerRole::Server)?;
//! let tls_config = MtlsServerConfig::from_paths(paths)?.build_server_tls();
//! # Ok(())
//! # }
//! ```

use crate::error::{TlsError, TlsResult};
use crate::san_validation::validate_san;
use crate::EXPIRY_WARNING_DAYS;
use std::fs;
use std::path::{Path, PathBuf};
use tonic::transport::{Certificate, ClientTlsConfig, Identity, ServerTlsConfig};
use tracing::info;

/// CA variable shared by both roles.
pub const CA_CERT_PATH_VAR: &str = "GRPC_CA_CERT_PATH";

/// Which end of the connection a set of certificate paths belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    Server,
    Client,
}

impl PeerRole {
    fn cert_var(self) -> &'static str {
        match self {
            PeerRole::Server => "GRPC_SERVER_CERT_PATH",
            PeerRole::Client => "GRPC_CLIENT_CERT_PATH",
        }
    }

    fn key_var(self) -> &'static str {
        match self {
            PeerRole::Server => "GRPC_SERVER_KEY_PATH",
            PeerRole::Client => "GRPC_CLIENT_KEY_PATH",
        }
    }
}

/// Certificate file paths for one side of the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfigPaths {
    /// CA certificate path (for verifying peer)
    pub ca_cert_path: PathBuf,
    /// This side's certificate
    pub cert_path: PathBuf,
    /// This side's private key
    pub key_path: PathBuf,
}

impl TlsConfigPaths {
    /// Load paths from environment variables
    ///
    /// - `GRPC_CA_CERT_PATH`: CA certificate (both roles)
    /// - `GRPC_SERVER_CERT_PATH` / `GRPC_SERVER_KEY_PATH` for the server role
    /// - `GRPC_CLIENT_CERT_PATH` / `GRPC_CLIENT_KEY_PATH` for the client role
    pub fn from_env(role: PeerRole) -> TlsResult<Self> {
        let read = |var: &str, hint: &str| {
            std::env::var(var).map_err(|_| TlsError::MissingEnvVar {
                var_name: var.to_string(),
                hint: hint.to_string(),
            })
        };

        let ca_cert_path = read(CA_CERT_PATH_VAR, "Set to CA certificate path for peer verification")?;
        let cert_path = read(role.cert_var(), "Set to this service's certificate path")?;
        let key_path = read(role.key_var(), "Set to this service's private key path")?;

        Ok(Self {
            ca_cert_path: PathBuf::from(ca_cert_path),
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
        })
    }

    /// Like [`from_env`](Self::from_env) but returns `None` when none of the
    /// variables are set. A partial configuration is still an error.
    pub fn from_env_optional(role: PeerRole) -> TlsResult<Option<Self>> {
        let vars = [CA_CERT_PATH_VAR, role.cert_var(), role.key_var()];
        let present: Vec<&str> = vars
            .iter()
            .copied()
            .filter(|v| std::env::var(v).is_ok())
            .collect();

        if present.is_empty() {
            return Ok(None);
        }
        if present.len() < vars.len() {
            let missing = vars
                .iter()
                .copied()
                .filter(|v| !present.contains(v))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(TlsError::IncompleteConfig {
                present: present.join(", "),
                missing,
            });
        }

        Self::from_env(role).map(Some)
    }
}

fn read_pem_file(path: &Path) -> TlsResult<String> {
    fs::read_to_string(path).map_err(|e| TlsError::CertificateReadError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// mTLS server configuration
#[derive(Debug, Clone)]
pub struct MtlsServerConfig {
    /// CA certificate for verifying client certificates
    ca_cert_pem: String,
    server_cert_pem: String,
    server_key_pem: String,
}

impl MtlsServerConfig {
    /// Load mTLS server configuration from file paths
    ///
    /// Validates certificate expiration on load.
    pub fn from_paths(paths: TlsConfigPaths) -> TlsResult<Self> {
        let config = Self::from_pem(
            read_pem_file(&paths.ca_cert_path)?,
            read_pem_file(&paths.cert_path)?,
            read_pem_file(&paths.key_path)?,
        )?;

        info!(
            ca_cert = ?paths.ca_cert_path,
            server_cert = ?paths.cert_path,
            "mTLS server configuration loaded with client certificate verification"
        );

        Ok(config)
    }

    /// Build from in-memory PEM material (tests, secrets managers).
    pub fn from_pem(
        ca_cert_pem: impl Into<String>,
        server_cert_pem: impl Into<String>,
        server_key_pem: impl Into<String>,
    ) -> TlsResult<Self> {
        let config = Self {
            ca_cert_pem: ca_cert_pem.into(),
            server_cert_pem: server_cert_pem.into(),
            server_key_pem: server_key_pem.into(),
        };
        crate::validate_cert_expiration(&config.server_cert_pem, EXPIRY_WARNING_DAYS)?;
        Ok(config)
    }

    /// Fail unless the server certificate covers at least one of `names`.
    pub fn require_sans(&self, names: &[String]) -> TlsResult<()> {
        validate_san(&self.server_cert_pem, names)
    }

    /// Build tonic ServerTlsConfig with mandatory client cert verification
    pub fn build_server_tls(&self) -> ServerTlsConfig {
        let identity = Identity::from_pem(&self.server_cert_pem, &self.server_key_pem);
        let client_ca = Certificate::from_pem(&self.ca_cert_pem);

        ServerTlsConfig::new()
            .identity(identity)
            .client_ca_root(client_ca)
    }
}

/// mTLS client configuration
#[derive(Debug, Clone)]
pub struct MtlsClientConfig {
    /// CA certificate for verifying the server
    ca_cert_pem: String,
    client_cert_pem: String,
    client_key_pem: String,
    /// Name the server certificate must carry
    domain_name: String,
}

impl MtlsClientConfig {
    /// Load mTLS client configuration from file paths
    pub fn from_paths(paths: TlsConfigPaths, domain_name: impl Into<String>) -> TlsResult<Self> {
        let config = Self::from_pem(
            read_pem_file(&paths.ca_cert_path)?,
            read_pem_file(&paths.cert_path)?,
            read_pem_file(&paths.key_path)?,
            domain_name,
        )?;

        info!(
            ca_cert = ?paths.ca_cert_path,
            client_cert = ?paths.cert_path,
            domain = %config.domain_name,
            "mTLS client configuration loaded"
        );

        Ok(config)
    }

    pub fn from_pem(
        ca_cert_pem: impl Into<String>,
        client_cert_pem: impl Into<String>,
        client_key_pem: impl Into<String>,
        domain_name: impl Into<String>,
    ) -> TlsResult<Self> {
        let config = Self {
            ca_cert_pem: ca_cert_pem.into(),
            client_cert_pem: client_cert_pem.into(),
            client_key_pem: client_key_pem.into(),
            domain_name: domain_name.into(),
        };
        if config.client_cert_pem.trim().is_empty() {
            return Err(TlsError::MtlsClientCertMissing);
        }
        if config.client_key_pem.trim().is_empty() {
            return Err(TlsError::MtlsClientKeyMissing);
        }
        crate::validate_cert_expiration(&config.client_cert_pem, EXPIRY_WARNING_DAYS)?;
        Ok(config)
    }

    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    /// Build tonic ClientTlsConfig presenting the client certificate
    pub fn build_client_tls(&self) -> ClientTlsConfig {
        let server_ca = Certificate::from_pem(&self.ca_cert_pem);
        let identity = Identity::from_pem(&self.client_cert_pem, &self.client_key_pem);

        ClientTlsConfig::new()
            .ca_certificate(server_ca)
            .identity(identity)
            .domain_name(&self.domain_name)
    }
}
