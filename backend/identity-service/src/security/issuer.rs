//! Token issuance
//!
//! Login and account flows hand a validated [`Principal`] to the issuer and
//! get back a signed token valid from now for the codec's lifetime.

use chrono::Utc;
use crypto_core::jwt::{Principal, TokenCodec, TokenError};
use crypto_core::hash::token_fingerprint;
use std::sync::Arc;

/// A freshly signed token as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds until expiry.
    pub expires_in: i64,
}

#[derive(Debug, Clone)]
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
}

impl TokenIssuer {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    pub fn issue(&self, principal: &Principal) -> Result<IssuedToken, TokenError> {
        let access_token = self.codec.encode(principal, Utc::now())?;

        tracing::info!(
            subject_id = principal.subject_id(),
            token = %token_fingerprint(&access_token),
            "issued access token"
        );

        Ok(IssuedToken {
            access_token,
            token_type: "Bearer",
            expires_in: self.codec.lifetime().num_seconds(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_core::ValidationOutcome;

    fn codec() -> Arc<TokenCodec> {
        Arc::new(
            TokenCodec::new(b"issuer-test-secret-of-sufficient-size", chrono::Duration::minutes(15))
                .unwrap(),
        )
    }

    #[test]
    fn issued_token_verifies_with_same_codec() {
        let codec = codec();
        let issuer = TokenIssuer::new(Arc::clone(&codec));
        let principal = Principal::new(42, "ann@example.com", true).unwrap();

        let issued = issuer.issue(&principal).unwrap();
        assert_eq!(issued.token_type, "Bearer");
        assert_eq!(issued.expires_in, 900);

        match codec.decode(&issued.access_token, Utc::now()) {
            ValidationOutcome::Verified(claims) => {
                assert_eq!(claims.subject_id(), 42);
                assert_eq!(claims.contact(), "ann@example.com");
                assert!(claims.privileged());
            }
            other => panic!("expected verified token, got {other:?}"),
        }
    }
}
