/// HTTP middleware for cart-service
pub mod grpc_auth;

pub use grpc_auth::{Authenticated, GrpcAuthMiddleware, WhiteList};
