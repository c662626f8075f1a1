use crypto_core::jwt::{RejectReason, AUTH_ERROR_METADATA_KEY, REJECT_REASON_METADATA_KEY};
use thiserror::Error;
use tonic::metadata::MetadataValue;
use tonic::{Code, Status};

pub type Result<T> = std::result::Result<T, IdentityError>;

/// Marker values carried in `x-auth-error`.
pub const REJECTED_MARKER: &str = "rejected";
pub const AUTHORITY_FAULT_MARKER: &str = "authority-fault";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid authorization token: {0}")]
    Rejected(RejectReason),

    #[error("Database error: {0}")]
    Database(String),
}

impl IdentityError {
    /// Convert to gRPC Status for wire protocol
    ///
    /// Every status carries `x-auth-error` so callers can tell a verdict from
    /// a transport failure.
    pub fn to_status(&self) -> Status {
        match self {
            IdentityError::Rejected(reason) => {
                let mut status = Status::new(
                    Code::Unauthenticated,
                    format!("Invalid authorization token: {reason}"),
                );
                let metadata = status.metadata_mut();
                metadata.insert(
                    AUTH_ERROR_METADATA_KEY,
                    MetadataValue::from_static(REJECTED_MARKER),
                );
                metadata.insert(
                    REJECT_REASON_METADATA_KEY,
                    MetadataValue::from_static(reason.as_str()),
                );
                status
            }
            IdentityError::Database(_) => {
                // Don't leak internal details
                let mut status = Status::new(Code::Internal, "Internal server error");
                status.metadata_mut().insert(
                    AUTH_ERROR_METADATA_KEY,
                    MetadataValue::from_static(AUTHORITY_FAULT_MARKER),
                );
                status
            }
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, IdentityError::Rejected(_))
    }
}

impl From<RejectReason> for IdentityError {
    fn from(reason: RejectReason) -> Self {
        IdentityError::Rejected(reason)
    }
}

impl From<sqlx::Error> for IdentityError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        IdentityError::Database(err.to_string())
    }
}

// gRPC Status conversion
impl From<IdentityError> for Status {
    fn from(err: IdentityError) -> Self {
        err.to_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(status: &Status, key: &str) -> Option<String> {
        status
            .metadata()
            .get(key)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[test]
    fn rejection_carries_reason_and_marker() {
        for reason in RejectReason::ALL {
            let status = IdentityError::Rejected(reason).to_status();
            assert_eq!(status.code(), Code::Unauthenticated);
            assert_eq!(
                status.message(),
                format!("Invalid authorization token: {}", reason.as_str())
            );
            assert_eq!(
                metadata(&status, AUTH_ERROR_METADATA_KEY).as_deref(),
                Some("rejected")
            );
            assert_eq!(
                metadata(&status, REJECT_REASON_METADATA_KEY).as_deref(),
                Some(reason.as_str())
            );
        }
    }

    #[test]
    fn faults_hide_details() {
        let status: Status = IdentityError::Database("connection reset by peer".into()).into();
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "Internal server error");
        assert_eq!(
            metadata(&status, AUTH_ERROR_METADATA_KEY).as_deref(),
            Some("authority-fault")
        );
        assert!(metadata(&status, REJECT_REASON_METADATA_KEY).is_none());
    }
}
