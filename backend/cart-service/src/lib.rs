//! Cart Service Library
//!
//! Every protected request is validated once through identity-service over
//! mTLS gRPC and then checked against the route's authorization requirement.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod security;

pub use error::{ApiError, Result};
