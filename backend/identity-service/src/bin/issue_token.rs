//! Mint a token for local testing.
//!
//! Usage: `issue-token <USER_ID> <EMAIL> [--admin]`
//!
//! Reads `JWT_SECRET`, `JWT_EXPIRY_SECONDS` and `JWT_CLOCK_SKEW_SECONDS` like
//! the service does and prints the signed token to stdout.

use anyhow::{bail, Context, Result};
use identity_service::config::Settings;
use identity_service::security::{Principal, TokenIssuer};
use std::sync::Arc;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(id), Some(email)) = (args.next(), args.next()) else {
        bail!("usage: issue-token <USER_ID> <EMAIL> [--admin]");
    };
    let admin = match args.next().as_deref() {
        None => false,
        Some("--admin") => true,
        Some(other) => bail!("unexpected argument {other:?}"),
    };

    let id: i32 = id.parse().context("USER_ID must be an integer")?;
    let principal = Principal::new(id, email, admin).context("Invalid principal")?;

    let settings = Settings::load().context("Failed to load configuration")?;
    let issuer = TokenIssuer::new(Arc::new(settings.jwt.build_codec()?));
    let issued = issuer.issue(&principal)?;

    println!("{}", issued.access_token);
    Ok(())
}
