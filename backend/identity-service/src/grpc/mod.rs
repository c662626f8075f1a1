/// gRPC server module for identity-service
///
/// Exports:
/// - UserAuthService: ValidateToken implementation
/// - storefront: Generated protobuf types from auth.proto
pub mod server;

pub use server::{correlation_interceptor, storefront, UserAuthService};
