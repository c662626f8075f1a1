//! Certificate Generation for Development and Testing
//!
//! Mints a private CA plus one server and one client leaf signed by it, which
//! is exactly the trust shape the identity boundary expects in production.
//! **WARNING**: NEVER use in production - provision real certificates from the
//! deployment's CA.

use crate::error::{TlsError, TlsResult};
use crate::mtls::TlsConfigPaths;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair, KeyUsagePurpose, SanType,
};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use tracing::info;

const ORGANIZATION: &str = "Storefront Development";

/// Names the development server certificate answers to.
pub const DEFAULT_SERVER_NAMES: &[&str] = &[
    "localhost",
    "identity-service",
    "*.storefront.svc.cluster.local",
];

/// Common name of the development client certificate.
pub const DEFAULT_CLIENT_NAME: &str = "cart-service";

/// Bundle of certificates for development
#[derive(Clone)]
pub struct CertificateBundle {
    /// CA certificate (PEM)
    pub ca_cert: String,
    /// CA private key (PEM)
    pub ca_key: String,
    /// Server certificate signed by CA (PEM)
    pub server_cert: String,
    /// Server private key (PEM)
    pub server_key: String,
    /// Client certificate for mTLS (PEM)
    pub client_cert: String,
    /// Client private key (PEM)
    pub client_key: String,
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("ca_key", &"<redacted>")
            .field("server_key", &"<redacted>")
            .field("client_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// On-disk locations of a written bundle, split per role.
#[derive(Debug, Clone)]
pub struct BundlePaths {
    pub server: TlsConfigPaths,
    pub client: TlsConfigPaths,
}

/// Generate development certificates (CA, server, client)
///
/// **Usage**: Development and testing only
/// **Subject**: CN=Storefront Development CA / CN=localhost / CN=cart-service
pub fn generate_dev_certificates() -> TlsResult<CertificateBundle> {
    generate_dev_certificates_for(DEFAULT_SERVER_NAMES, DEFAULT_CLIENT_NAME)
}

/// Same as [`generate_dev_certificates`] with explicit server DNS names and
/// client common name. The server certificate also covers 127.0.0.1.
pub fn generate_dev_certificates_for(
    server_names: &[&str],
    client_name: &str,
) -> TlsResult<CertificateBundle> {
    // 1. CA
    let mut ca_params = CertificateParams::default();
    ca_params.distinguished_name = distinguished_name("Storefront Development CA");
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];

    let ca_keypair = KeyPair::generate()?;
    let ca_cert = ca_params.self_signed(&ca_keypair)?;

    // 2. Server leaf
    let common_name = server_names.first().copied().unwrap_or("localhost");
    let mut server_params = CertificateParams::default();
    server_params.distinguished_name = distinguished_name(common_name);
    for name in server_names {
        server_params
            .subject_alt_names
            .push(SanType::DnsName((*name).try_into()?));
    }
    server_params
        .subject_alt_names
        .push(SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    server_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    let (server_cert, server_key) = sign_leaf(server_params, &ca_cert, &ca_keypair)?;

    // 3. Client leaf
    let mut client_params = CertificateParams::default();
    client_params.distinguished_name = distinguished_name(client_name);
    client_params
        .subject_alt_names
        .push(SanType::DnsName(client_name.try_into()?));
    client_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
    let (client_cert, client_key) = sign_leaf(client_params, &ca_cert, &ca_keypair)?;

    info!(
        server_names = ?server_names,
        client = %client_name,
        "Generated development certificates (CA, server, client)"
    );

    Ok(CertificateBundle {
        ca_cert: ca_cert.pem(),
        ca_key: ca_keypair.serialize_pem(),
        server_cert,
        server_key,
        client_cert,
        client_key,
    })
}

fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    dn.push(DnType::OrganizationName, ORGANIZATION);
    dn
}

fn sign_leaf(
    mut params: CertificateParams,
    ca_cert: &Certificate,
    ca_keypair: &KeyPair,
) -> TlsResult<(String, String)> {
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    let keypair = KeyPair::generate()?;
    let cert = params.signed_by(&keypair, ca_cert, ca_keypair)?;
    Ok((cert.pem(), keypair.serialize_pem()))
}

/// Write certificate bundle to files
///
/// Creates directory structure:
/// ```text
/// certs/
///   ca.crt        (CA certificate)
///   ca.key        (CA private key)
///   server.crt    (Server certificate)
///   server.key    (Server private key)
///   client.crt    (Client certificate)
///   client.key    (Client private key)
/// ```
pub fn write_cert_bundle(bundle: &CertificateBundle, output_dir: &Path) -> TlsResult<BundlePaths> {
    fs::create_dir_all(output_dir).map_err(|source| TlsError::CertificateWriteError {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let files = [
        ("ca.crt", &bundle.ca_cert),
        ("ca.key", &bundle.ca_key),
        ("server.crt", &bundle.server_cert),
        ("server.key", &bundle.server_key),
        ("client.crt", &bundle.client_cert),
        ("client.key", &bundle.client_key),
    ];
    for (name, contents) in files {
        let path = output_dir.join(name);
        fs::write(&path, contents)
            .map_err(|source| TlsError::CertificateWriteError { path, source })?;
    }

    info!(output_dir = ?output_dir, "Certificate bundle written to disk");

    Ok(BundlePaths {
        server: TlsConfigPaths {
            ca_cert_path: output_dir.join("ca.crt"),
            cert_path: output_dir.join("server.crt"),
            key_path: output_dir.join("server.key"),
        },
        client: TlsConfigPaths {
            ca_cert_path: output_dir.join("ca.crt"),
            cert_path: output_dir.join("client.crt"),
            key_path: output_dir.join("client.key"),
        },
    })
}
