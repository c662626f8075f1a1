//! Subject Alternative Name (SAN) validation for mTLS
//!
//! Confirms a certificate actually names the service it is deployed as, so a
//! misprovisioned identity-service certificate fails at startup instead of at
//! the first handshake.

use crate::error::{TlsError, TlsResult};
use std::net::IpAddr;
use x509_parser::prelude::*;

/// SAN (Subject Alternative Name) types we validate
#[derive(Debug, Clone, PartialEq)]
pub enum SanEntry {
    /// DNS name (e.g., "identity-service.storefront.internal")
    DnsName(String),
    /// IP address
    IpAddress(IpAddr),
}

impl SanEntry {
    /// Check if this SAN entry matches a pattern
    ///
    /// A leading `*.` in the pattern stands for exactly one DNS label, so
    /// "*.storefront.internal" matches "identity.storefront.internal" but not
    /// "a.b.storefront.internal". IP patterns compare by address.
    pub fn matches(&self, pattern: &str) -> bool {
        match self {
            SanEntry::DnsName(name) => match pattern.strip_prefix("*.") {
                Some(suffix) => name
                    .split_once('.')
                    .is_some_and(|(label, rest)| !label.is_empty() && rest == suffix),
                None => name.eq_ignore_ascii_case(pattern),
            },
            SanEntry::IpAddress(ip) => pattern.parse::<IpAddr>().ok() == Some(*ip),
        }
    }
}

/// Extract SAN entries from a PEM certificate
pub fn extract_san_entries(cert_pem: &str) -> TlsResult<Vec<SanEntry>> {
    let pem = ::pem::parse(cert_pem.as_bytes())?;

    let (_, cert) =
        X509Certificate::from_der(pem.contents()).map_err(|e| {
            TlsError::CertificateParseError {
                path: "memory".into(),
                reason: format!("X.509 parse failed: {}", e),
            }
        })?;

    let mut san_entries = Vec::new();

    // Find SubjectAlternativeName extension
    if let Ok(Some(san_ext)) = cert.subject_alternative_name() {
        for name in &san_ext.value.general_names {
            match name {
                GeneralName::DNSName(dns) => {
                    san_entries.push(SanEntry::DnsName(dns.to_string()));
                }
                GeneralName::IPAddress(ip_bytes) => {
                    if let Some(ip) = parse_ip_address(ip_bytes) {
                        san_entries.push(SanEntry::IpAddress(ip));
                    }
                }
                _ => {
                    // Ignore other types (Email, URI, etc.)
                }
            }
        }
    }

    Ok(san_entries)
}

/// Validate that a certificate contains at least one expected SAN
///
/// Returns Ok if ANY expected SAN matches.
/// Returns Err if NO expected SANs found.
pub fn validate_san(cert_pem: &str, expected_sans: &[String]) -> TlsResult<()> {
    let actual_sans = extract_san_entries(cert_pem)?;

    let matched = expected_sans
        .iter()
        .find(|expected| actual_sans.iter().any(|actual| actual.matches(expected)));

    if let Some(expected) = matched {
        tracing::debug!(expected = %expected, "SAN validation passed");
        return Ok(());
    }

    Err(TlsError::SanValidationError {
        expected: expected_sans.join(", "),
        actual: actual_sans
            .iter()
            .map(|san| match san {
                SanEntry::DnsName(name) => name.clone(),
                SanEntry::IpAddress(ip) => ip.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Parse the raw octets of an iPAddress GeneralName.
fn parse_ip_address(bytes: &[u8]) -> Option<IpAddr> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        return Some(IpAddr::from(octets));
    }
    <[u8; 16]>::try_from(bytes).ok().map(IpAddr::from)
}
