/// Security module for token issuance and subject lookup
///
/// - **issuer**: stamps the current time and signs tokens via crypto-core
/// - **user_directory**: answers whether a token's subject still exists
pub use crypto_core::jwt::{Claims, Principal, RejectReason, TokenCodec};

pub mod issuer;
pub mod user_directory;

pub use issuer::{IssuedToken, TokenIssuer};
pub use user_directory::{InMemoryUserDirectory, PgUserDirectory, UserDirectory};
