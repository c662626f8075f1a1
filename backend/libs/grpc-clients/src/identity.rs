use crate::error::AuthError;
use crate::proto::auth::Payload;
use validator::ValidateEmail;

/// Identity the authority vouched for on this request.
///
/// Only produced from a successful `ValidateToken` response, so holding one
/// means the token was verified by identity-service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationIdentity {
    subject_id: i32,
    contact: String,
    privileged: bool,
}

impl AuthorizationIdentity {
    pub(crate) fn from_payload(payload: Option<Payload>) -> Result<Self, AuthError> {
        let payload = payload
            .ok_or_else(|| AuthError::AuthorityFault("response carried no payload".into()))?;

        if payload.user_id <= 0 {
            return Err(AuthError::AuthorityFault(format!(
                "payload subject id {} is not positive",
                payload.user_id
            )));
        }
        if !payload.email.validate_email() {
            return Err(AuthError::AuthorityFault(
                "payload contact is not an email address".into(),
            ));
        }

        Ok(Self {
            subject_id: payload.user_id,
            contact: payload.email,
            privileged: payload.is_admin,
        })
    }

    /// Fabricate an identity without a validation round trip.
    #[cfg(any(test, feature = "test-util"))]
    pub fn for_testing(subject_id: i32, contact: impl Into<String>, privileged: bool) -> Self {
        Self {
            subject_id,
            contact: contact.into(),
            privileged,
        }
    }

    pub fn subject_id(&self) -> i32 {
        self.subject_id
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }

    pub fn privileged(&self) -> bool {
        self.privileged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(user_id: i32, email: &str, is_admin: bool) -> Option<Payload> {
        Some(Payload {
            user_id,
            email: email.to_string(),
            is_admin,
        })
    }

    #[test]
    fn valid_payload_becomes_identity() {
        let identity =
            AuthorizationIdentity::from_payload(payload(12, "bob@example.com", true)).unwrap();
        assert_eq!(identity.subject_id(), 12);
        assert_eq!(identity.contact(), "bob@example.com");
        assert!(identity.privileged());
    }

    #[test]
    fn missing_or_invalid_payload_is_authority_fault() {
        for candidate in [
            None,
            payload(0, "bob@example.com", false),
            payload(-3, "bob@example.com", false),
            payload(4, "   ", false),
            payload(4, "bob", false),
            payload(4, "bob@", false),
        ] {
            assert!(matches!(
                AuthorizationIdentity::from_payload(candidate),
                Err(AuthError::AuthorityFault(_))
            ));
        }
    }
}
