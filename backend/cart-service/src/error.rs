/// Error types for Cart Service
///
/// Every failure leaves the service as `{"error": {"code", "message", "reason"}}`.
/// Credential and authorization failures are passed through verbatim; an
/// unreachable or faulty identity-service is summarized as "try again later".
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use crypto_core::jwt::RejectReason;
use grpc_clients::AuthError;
use serde::Serialize;

pub type Result<T> = std::result::Result<T, ApiError>;

pub const TRY_AGAIN_LATER: &str = "Authentication is temporarily unavailable, try again later";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No usable credential, or identity-service rejected it
    #[error("{message}")]
    Unauthenticated {
        message: String,
        reason: Option<RejectReason>,
    },

    #[error("{0}")]
    Forbidden(String),

    /// identity-service unreachable or faulty; detail stays in the logs
    #[error("Authentication is temporarily unavailable, try again later")]
    ServiceUnavailable,

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn missing_credentials() -> Self {
        ApiError::Unauthenticated {
            message: "Invalid authorization header".to_string(),
            reason: None,
        }
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden("You do not have permission to perform this action.".to_string())
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            ApiError::Unauthenticated { reason, .. } => *reason,
            _ => None,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Rejected(reason) => ApiError::Unauthenticated {
                message: format!("Invalid authorization token: {reason}"),
                reason: Some(reason),
            },
            AuthError::Unavailable(_) | AuthError::AuthorityFault(_) => {
                ApiError::ServiceUnavailable
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let code = match status {
            StatusCode::UNAUTHORIZED => "unauthorized",
            StatusCode::FORBIDDEN => "forbidden",
            StatusCode::SERVICE_UNAVAILABLE => "service_unavailable",
            _ => "bad_request",
        };

        HttpResponse::build(status).json(ErrorBody {
            error: ErrorDetail {
                code,
                message: self.to_string(),
                reason: self.reason().map(|r| r.as_str()),
            },
        })
    }
}
