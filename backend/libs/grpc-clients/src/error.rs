use crypto_core::jwt::RejectReason;

/// Caller-facing outcome of a failed validation.
///
/// Only `Rejected` says anything about the credential. The other two are
/// infrastructure problems and must never be reported as a bad token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("token rejected: {0}")]
    Rejected(RejectReason),

    #[error("identity authority unavailable: {0}")]
    Unavailable(String),

    #[error("identity authority fault: {0}")]
    AuthorityFault(String),
}

impl AuthError {
    /// Stable error kind, e.g. `rejected:expired`, `unavailable`, `authority-fault`.
    pub fn code(&self) -> String {
        match self {
            AuthError::Rejected(reason) => format!("rejected:{reason}"),
            AuthError::Unavailable(_) => "unavailable".to_string(),
            AuthError::AuthorityFault(_) => "authority-fault".to_string(),
        }
    }

    /// True when the caller should re-authenticate rather than retry later.
    pub fn is_credential_error(&self) -> bool {
        matches!(self, AuthError::Rejected(_))
    }
}
