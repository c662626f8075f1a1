//! Shared token and identity primitives for Storefront services.
//!
//! `jwt` holds the token codec used by the identity service, `hash` provides
//! fingerprints that are safe to log, and `correlation` carries the request id
//! conventions shared by the HTTP and gRPC edges.

pub mod correlation;
pub mod hash;
pub mod jwt;

pub use jwt::{Claims, Principal, RejectReason, TokenCodec, TokenError, ValidationOutcome};
