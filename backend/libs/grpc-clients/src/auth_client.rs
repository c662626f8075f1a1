//! Validation client for identity-service.
//!
//! One `validate` call per inbound request. The call is bounded by the
//! configured request timeout and, when given, the parent request's deadline,
//! whichever comes first. Dropping the returned future cancels the RPC.

use crate::config::AuthClientConfig;
use crate::error::AuthError;
use crate::identity::AuthorizationIdentity;
use crate::pool::ChannelPool;
use crate::proto::auth::{user_auth_client::UserAuthClient, AuthRequest, JwtToken};
use crypto_core::correlation::{CorrelationId, GRPC_CORRELATION_ID_KEY};
use crypto_core::hash::token_fingerprint;
use crypto_core::jwt::{RejectReason, AUTH_ERROR_METADATA_KEY, REJECT_REASON_METADATA_KEY};
use std::time::Duration;
use tokio::time::Instant;
use tonic::metadata::MetadataValue;
use tonic::{Code, Request, Status};
use tracing::{debug, error, warn};

/// Per-call options supplied by the inbound request.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Deadline of the request that needs the identity.
    pub deadline: Option<Instant>,
    pub correlation_id: Option<CorrelationId>,
}

#[derive(Debug)]
pub struct AuthClient {
    pool: ChannelPool,
    request_timeout: Duration,
}

impl AuthClient {
    pub fn new(config: &AuthClientConfig) -> Result<Self, tonic::transport::Error> {
        Ok(Self {
            pool: ChannelPool::new(config)?,
            request_timeout: config.request_timeout,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Validate `token` with the default call options.
    pub async fn validate(&self, token: &str) -> Result<AuthorizationIdentity, AuthError> {
        self.validate_with(token, &CallContext::default()).await
    }

    pub async fn validate_with(
        &self,
        token: &str,
        ctx: &CallContext,
    ) -> Result<AuthorizationIdentity, AuthError> {
        let started = Instant::now();
        let deadline = match ctx.deadline {
            Some(parent) => parent.min(started + self.request_timeout),
            None => started + self.request_timeout,
        };
        let budget = deadline.saturating_duration_since(started);
        let fingerprint = token_fingerprint(token);

        if budget.is_zero() {
            warn!(token = %fingerprint, "request deadline already passed before validation");
            return Err(AuthError::Unavailable(
                "request deadline passed before validation started".into(),
            ));
        }

        let mut request = Request::new(AuthRequest {
            token: Some(JwtToken {
                value: token.to_string(),
            }),
        });
        request.set_timeout(budget);
        if let Some(id) = &ctx.correlation_id {
            if let Ok(value) = MetadataValue::try_from(id.as_str()) {
                request.metadata_mut().insert(GRPC_CORRELATION_ID_KEY, value);
            }
        }

        let mut client = UserAuthClient::new(self.pool.get());
        let response = match tokio::time::timeout_at(deadline, client.validate_token(request)).await
        {
            Ok(Ok(response)) => response.into_inner(),
            Ok(Err(status)) => {
                let err = classify_status(&status);
                log_failure(&err, &status, &fingerprint, ctx);
                return Err(err);
            }
            Err(_) => {
                warn!(
                    token = %fingerprint,
                    correlation_id = ?ctx.correlation_id.as_ref().map(CorrelationId::as_str),
                    budget_ms = budget.as_millis() as u64,
                    "identity-service did not answer within the deadline"
                );
                return Err(AuthError::Unavailable(format!(
                    "no answer within {}ms",
                    budget.as_millis()
                )));
            }
        };

        let identity = AuthorizationIdentity::from_payload(response.payload).map_err(|err| {
            error!(token = %fingerprint, error = %err, "identity-service returned an invalid payload");
            err
        })?;

        debug!(
            token = %fingerprint,
            subject_id = identity.subject_id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "token validated"
        );
        Ok(identity)
    }
}

/// Map a failed call onto the caller-facing taxonomy.
///
/// identity-service marks every status it produces with `x-auth-error`.
/// A status without that marker came from the transport (refused connection,
/// TLS failure, reset stream, timeout) and means the authority was unreachable.
fn classify_status(status: &Status) -> AuthError {
    let marker = status
        .metadata()
        .get(AUTH_ERROR_METADATA_KEY)
        .and_then(|v| v.to_str().ok());

    match marker {
        Some("rejected") if status.code() == Code::Unauthenticated => {
            let reason = status
                .metadata()
                .get(REJECT_REASON_METADATA_KEY)
                .and_then(|v| v.to_str().ok())
                .map(str::parse::<RejectReason>);
            match reason {
                Some(Ok(reason)) => AuthError::Rejected(reason),
                Some(Err(err)) => AuthError::AuthorityFault(err.to_string()),
                None => AuthError::AuthorityFault("rejection without a reason".into()),
            }
        }
        Some(_) => AuthError::AuthorityFault(format!(
            "{:?}: {}",
            status.code(),
            status.message()
        )),
        None => AuthError::Unavailable(format!("{:?}: {}", status.code(), status.message())),
    }
}

fn log_failure(err: &AuthError, status: &Status, fingerprint: &str, ctx: &CallContext) {
    let correlation_id = ctx.correlation_id.as_ref().map(CorrelationId::as_str);
    match err {
        AuthError::Rejected(reason) => debug!(
            token = %fingerprint,
            correlation_id = ?correlation_id,
            reason = %reason,
            "token rejected by identity-service"
        ),
        AuthError::Unavailable(_) => warn!(
            token = %fingerprint,
            correlation_id = ?correlation_id,
            code = ?status.code(),
            message = %status.message(),
            "identity-service unavailable"
        ),
        AuthError::AuthorityFault(_) => error!(
            token = %fingerprint,
            correlation_id = ?correlation_id,
            code = ?status.code(),
            message = %status.message(),
            "identity-service reported an internal fault"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_metadata(mut status: Status, pairs: &[(&'static str, &'static str)]) -> Status {
        for &(key, value) in pairs {
            status
                .metadata_mut()
                .insert(key, MetadataValue::from_static(value));
        }
        status
    }

    #[test]
    fn rejection_with_known_reason() {
        let status = with_metadata(
            Status::unauthenticated("Invalid authorization token: expired"),
            &[
                (AUTH_ERROR_METADATA_KEY, "rejected"),
                (REJECT_REASON_METADATA_KEY, "expired"),
            ],
        );
        assert_eq!(
            classify_status(&status),
            AuthError::Rejected(RejectReason::Expired)
        );
    }

    #[test]
    fn rejection_with_unknown_or_missing_reason_is_fault() {
        let unknown = with_metadata(
            Status::unauthenticated("?"),
            &[
                (AUTH_ERROR_METADATA_KEY, "rejected"),
                (REJECT_REASON_METADATA_KEY, "moon-phase"),
            ],
        );
        assert!(matches!(
            classify_status(&unknown),
            AuthError::AuthorityFault(_)
        ));

        let missing = with_metadata(
            Status::unauthenticated("?"),
            &[(AUTH_ERROR_METADATA_KEY, "rejected")],
        );
        assert!(matches!(
            classify_status(&missing),
            AuthError::AuthorityFault(_)
        ));
    }

    #[test]
    fn marked_internal_is_fault() {
        let status = with_metadata(
            Status::internal("Internal server error"),
            &[(AUTH_ERROR_METADATA_KEY, "authority-fault")],
        );
        assert!(matches!(
            classify_status(&status),
            AuthError::AuthorityFault(_)
        ));
    }

    #[test]
    fn unmarked_statuses_are_unavailable() {
        for status in [
            Status::unavailable("connection refused"),
            Status::deadline_exceeded("too slow"),
            Status::cancelled("Timeout expired"),
            Status::unknown("transport error"),
            Status::unauthenticated("proxy said no"),
            Status::internal("h2 protocol error"),
        ] {
            assert!(
                matches!(classify_status(&status), AuthError::Unavailable(_)),
                "{status:?}"
            );
        }
    }

    #[tokio::test]
    async fn expired_parent_deadline_short_circuits() {
        let config = AuthClientConfig::development("http://127.0.0.1:1");
        let client = AuthClient::new(&config).unwrap();
        let ctx = CallContext {
            deadline: Some(Instant::now()),
            correlation_id: None,
        };

        assert!(matches!(
            client.validate_with("token", &ctx).await,
            Err(AuthError::Unavailable(_))
        ));
    }
}
