/// Identity Service Library
///
/// The validation authority for Storefront: verifies bearer tokens on behalf
/// of other services over mutually authenticated gRPC.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `db`: Database queries (users)
/// - `error`: Error types and their wire mapping
/// - `grpc`: gRPC server implementation
/// - `security`: Token issuance and subject lookup
pub mod config;
pub mod db;
pub mod error;
pub mod grpc;
pub mod security;

// Re-export commonly used types
pub use error::{IdentityError, Result};
pub use grpc::UserAuthService;
