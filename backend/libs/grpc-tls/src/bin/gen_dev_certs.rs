//! Writes a throwaway CA, server and client bundle for local mTLS runs.
//!
//! Usage: `gen-dev-certs [OUTPUT_DIR] [SERVER_NAME...]` (default `./certs`).

use anyhow::{Context, Result};
use grpc_tls::cert_generation::{
    generate_dev_certificates, generate_dev_certificates_for, write_cert_bundle,
    DEFAULT_CLIENT_NAME,
};
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| "certs".to_string()));
    let server_names: Vec<String> = args.collect();

    let bundle = if server_names.is_empty() {
        generate_dev_certificates()
    } else {
        let names: Vec<&str> = server_names.iter().map(String::as_str).collect();
        generate_dev_certificates_for(&names, DEFAULT_CLIENT_NAME)
    }
    .context("Failed to generate development certificates")?;

    let paths = write_cert_bundle(&bundle, &output_dir)
        .with_context(|| format!("Failed to write bundle to {}", output_dir.display()))?;

    info!(
        ca = %paths.server.ca_cert_path.display(),
        server_cert = %paths.server.cert_path.display(),
        client_cert = %paths.client.cert_path.display(),
        "Development certificates ready"
    );
    Ok(())
}
