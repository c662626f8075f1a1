/// gRPC server implementation for identity-service
///
/// Implements `ValidateToken` from auth.proto: strip an optional `Bearer`
/// scheme, decode against the current clock, optionally confirm the subject
/// still exists, and answer with the payload or a marked status.
use crate::error::IdentityError;
use crate::security::UserDirectory;
use chrono::{DateTime, Utc};
use crypto_core::correlation::{CorrelationId, GRPC_CORRELATION_ID_KEY};
use crypto_core::hash::token_fingerprint;
use crypto_core::jwt::{Claims, RejectReason, TokenCodec, ValidationOutcome};
use std::sync::Arc;
use tonic::codegen::InterceptedService;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info};

// Import generated protobuf types
pub mod storefront {
    pub mod auth {
        pub mod v1 {
            tonic::include_proto!("storefront.auth.v1");
        }
        pub use v1::*;
    }
}

use storefront::auth::user_auth_server::{UserAuth, UserAuthServer};
use storefront::auth::{AuthRequest, AuthResponse, Payload};

type Interceptor = fn(Request<()>) -> Result<Request<()>, Status>;

/// The validation authority
#[derive(Clone)]
pub struct UserAuthService {
    codec: Arc<TokenCodec>,
    directory: Option<Arc<dyn UserDirectory>>,
}

impl UserAuthService {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self {
            codec,
            directory: None,
        }
    }

    /// Reject tokens whose subject the directory no longer knows.
    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Wrap in the tonic server with correlation id extraction.
    pub fn into_server(self) -> InterceptedService<UserAuthServer<Self>, Interceptor> {
        UserAuthServer::with_interceptor(self, correlation_interceptor as Interceptor)
    }

    /// Verify `raw` as seen at `now`.
    pub async fn validate(&self, raw: &str, now: DateTime<Utc>) -> Result<Claims, IdentityError> {
        let token = strip_scheme(raw)?;

        let claims = match self.codec.decode(token, now) {
            ValidationOutcome::Verified(claims) => claims,
            ValidationOutcome::Rejected(reason) => return Err(reason.into()),
        };

        if let Some(directory) = &self.directory {
            if !directory.subject_exists(claims.subject_id()).await? {
                return Err(RejectReason::Revoked.into());
            }
        }

        Ok(claims)
    }
}

/// Accepts `"Bearer <jwt>"` or a bare `<jwt>`.
fn strip_scheme(raw: &str) -> Result<&str, RejectReason> {
    let mut parts = raw.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(token), None, None) => Ok(token),
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(RejectReason::Malformed),
    }
}

/// Stash the caller's correlation id (or a fresh one) in request extensions.
pub fn correlation_interceptor(mut req: Request<()>) -> Result<Request<()>, Status> {
    let inbound = req
        .metadata()
        .get(GRPC_CORRELATION_ID_KEY)
        .and_then(|v| v.to_str().ok());
    let correlation_id = CorrelationId::from_inbound(inbound);
    req.extensions_mut().insert(correlation_id);
    Ok(req)
}

#[tonic::async_trait]
impl UserAuth for UserAuthService {
    async fn validate_token(
        &self,
        request: Request<AuthRequest>,
    ) -> Result<Response<AuthResponse>, Status> {
        let correlation_id = request
            .extensions()
            .get::<CorrelationId>()
            .cloned()
            .unwrap_or_else(CorrelationId::generate);
        let raw = request
            .into_inner()
            .token
            .map(|t| t.value)
            .unwrap_or_default();
        let fingerprint = token_fingerprint(&raw);

        match self.validate(&raw, Utc::now()).await {
            Ok(claims) => {
                debug!(
                    correlation_id = %correlation_id,
                    token = %fingerprint,
                    subject_id = claims.subject_id(),
                    "token verified"
                );
                Ok(Response::new(AuthResponse {
                    payload: Some(Payload {
                        user_id: claims.subject_id(),
                        email: claims.contact().to_string(),
                        is_admin: claims.privileged(),
                    }),
                }))
            }
            Err(err) => {
                if err.is_rejection() {
                    info!(
                        correlation_id = %correlation_id,
                        token = %fingerprint,
                        error = %err,
                        "token rejected"
                    );
                } else {
                    error!(
                        correlation_id = %correlation_id,
                        token = %fingerprint,
                        error = %err,
                        "token validation failed"
                    );
                }
                Err(err.to_status())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::InMemoryUserDirectory;
    use async_trait::async_trait;
    use crypto_core::Principal;

    const SECRET: &[u8] = b"server-test-secret-with-enough-bytes!";

    fn service() -> UserAuthService {
        UserAuthService::new(Arc::new(
            TokenCodec::new(SECRET, chrono::Duration::hours(1)).unwrap(),
        ))
    }

    fn token_for(id: i32, now: DateTime<Utc>) -> String {
        TokenCodec::new(SECRET, chrono::Duration::hours(1))
            .unwrap()
            .encode(&Principal::new(id, "kim@example.com", false).unwrap(), now)
            .unwrap()
    }

    fn reason(err: IdentityError) -> RejectReason {
        match err {
            IdentityError::Rejected(reason) => reason,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    struct BrokenDirectory;

    #[async_trait]
    impl UserDirectory for BrokenDirectory {
        async fn subject_exists(&self, _subject_id: i32) -> crate::error::Result<bool> {
            Err(IdentityError::Database("pool timed out".into()))
        }
    }

    #[test]
    fn scheme_handling() {
        assert_eq!(strip_scheme("abc.def.ghi"), Ok("abc.def.ghi"));
        assert_eq!(strip_scheme("Bearer abc.def.ghi"), Ok("abc.def.ghi"));
        assert_eq!(strip_scheme("bearer  abc"), Ok("abc"));
        assert_eq!(strip_scheme(""), Err(RejectReason::Malformed));
        assert_eq!(strip_scheme("Basic dXNlcjpwYXNz"), Err(RejectReason::Malformed));
        assert_eq!(strip_scheme("Bearer a b"), Err(RejectReason::Malformed));
    }

    #[tokio::test]
    async fn verifies_bare_and_bearer_tokens() {
        let now = Utc::now();
        let token = token_for(7, now);
        let service = service();

        assert_eq!(service.validate(&token, now).await.unwrap().subject_id(), 7);
        let bearer = format!("Bearer {token}");
        assert_eq!(service.validate(&bearer, now).await.unwrap().subject_id(), 7);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let now = Utc::now();
        let token = token_for(7, now - chrono::Duration::hours(2));
        assert_eq!(
            reason(service().validate(&token, now).await.unwrap_err()),
            RejectReason::Expired
        );
    }

    #[tokio::test]
    async fn missing_subject_is_revoked() {
        let now = Utc::now();
        let directory = Arc::new(InMemoryUserDirectory::with_subjects([1]));
        let service = service().with_directory(directory.clone());

        assert!(service.validate(&token_for(1, now), now).await.is_ok());
        assert_eq!(
            reason(service.validate(&token_for(2, now), now).await.unwrap_err()),
            RejectReason::Revoked
        );

        directory.remove(1);
        assert_eq!(
            reason(service.validate(&token_for(1, now), now).await.unwrap_err()),
            RejectReason::Revoked
        );
    }

    #[tokio::test]
    async fn directory_failure_is_a_fault() {
        let now = Utc::now();
        let service = service().with_directory(Arc::new(BrokenDirectory));
        let err = service.validate(&token_for(1, now), now).await.unwrap_err();
        assert!(!err.is_rejection());
    }

    #[tokio::test]
    async fn bad_token_skips_directory_lookup() {
        let service = service().with_directory(Arc::new(BrokenDirectory));
        assert_eq!(
            reason(service.validate("garbage", Utc::now()).await.unwrap_err()),
            RejectReason::Malformed
        );
    }

    #[test]
    fn interceptor_keeps_inbound_correlation_id() {
        let mut req = Request::new(());
        req.metadata_mut()
            .insert(GRPC_CORRELATION_ID_KEY, "req-42".parse().unwrap());
        let req = correlation_interceptor(req).unwrap();
        assert_eq!(
            req.extensions().get::<CorrelationId>().unwrap().as_str(),
            "req-42"
        );

        let req = correlation_interceptor(Request::new(())).unwrap();
        assert!(req.extensions().get::<CorrelationId>().is_some());
    }
}
