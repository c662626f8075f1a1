//! gRPC TLS configuration with mutual authentication
//!
//! Both ends of the identity boundary present a certificate issued by the
//! deployment's private CA and verify the peer against that same CA before any
//! RPC is exchanged:
//!
//! - `mtls` builds tonic server/client TLS configs from PEM files or memory
//! - `san_validation` checks a certificate covers the names we advertise
//! - `cert_generation` mints a throwaway CA bundle for local runs and tests

use tracing::{info, warn};
use x509_parser::prelude::*;

pub mod cert_generation;
pub mod error;
pub mod mtls;
pub mod san_validation;

pub use cert_generation::{generate_dev_certificates, write_cert_bundle, CertificateBundle};
pub use error::{TlsError, TlsResult};
pub use mtls::{MtlsClientConfig, MtlsServerConfig, PeerRole, TlsConfigPaths};
pub use san_validation::{extract_san_entries, validate_san, SanEntry};

/// Days before expiry at which certificate loads start warning.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

/// Install the process-wide rustls crypto provider.
///
/// Safe to call more than once; later calls are no-ops.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Validate certificate expiration
///
/// Returns the number of whole days the certificate remains valid.
pub fn validate_cert_expiration(cert_pem: &str, warn_days_before: i64) -> TlsResult<i64> {
    let pem = ::pem::parse(cert_pem)?;

    let (_, cert) =
        X509Certificate::from_der(pem.contents()).map_err(|e| TlsError::CertificateParseError {
            path: "memory".into(),
            reason: format!("X.509 parse failed: {}", e),
        })?;

    let expiry_timestamp = cert.validity().not_after.timestamp();
    let now = chrono::Utc::now().timestamp();
    let days_until_expiry = (expiry_timestamp - now).div_euclid(86_400);

    if days_until_expiry < 0 {
        return Err(TlsError::CertificateExpired {
            days_ago: -days_until_expiry,
        });
    }

    if days_until_expiry < warn_days_before {
        warn!(
            days_remaining = days_until_expiry,
            "Certificate expiring soon - rotation recommended"
        );
    } else {
        info!(
            days_until_expiry = days_until_expiry,
            "Certificate validity check passed"
        );
    }

    Ok(days_until_expiry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_cert_expiration() {
        let bundle = generate_dev_certificates().unwrap();
        let days = validate_cert_expiration(&bundle.server_cert, EXPIRY_WARNING_DAYS).unwrap();
        assert!(days > EXPIRY_WARNING_DAYS);
    }

    #[test]
    fn test_validate_cert_expiration_rejects_garbage() {
        assert!(matches!(
            validate_cert_expiration("not a certificate", EXPIRY_WARNING_DAYS),
            Err(TlsError::PemParseError(_))
        ));
    }

    #[test]
    fn test_install_crypto_provider_is_idempotent() {
        install_crypto_provider();
        install_crypto_provider();
    }
}
