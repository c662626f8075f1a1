/// gRPC Clients Library
///
/// Client side of the identity boundary: callers hand an opaque bearer token to
/// [`AuthClient::validate`] and get back either a trusted
/// [`AuthorizationIdentity`] or an [`AuthError`] saying whether the token was
/// refused, the authority could not be reached, or the authority failed.
///
/// This library:
/// - Generates client stubs for `storefront.auth.v1.UserAuth`
/// - Keeps a small round-robin pool of long-lived HTTP/2 channels (mTLS)
/// - Bounds every call with a deadline and never retries
pub mod auth_client;
pub mod config;
pub mod error;
pub mod identity;
pub mod pool;

pub use auth_client::{AuthClient, CallContext};
pub use config::AuthClientConfig;
pub use error::AuthError;
pub use identity::AuthorizationIdentity;
pub use pool::ChannelPool;

pub use crypto_core::jwt::RejectReason;

// Re-export generated proto modules
pub mod proto {
    pub mod auth {
        pub mod v1 {
            tonic::include_proto!("storefront.auth.v1");
        }
        pub use v1::*;
    }
}

pub use proto::auth::user_auth_client::UserAuthClient;
