/// Authorization gate for cart-service
///
/// Decisions are made from the identity identity-service vouched for; the gate
/// never sees a raw token.
use crate::error::ApiError;
use grpc_clients::AuthorizationIdentity;

/// What a route demands of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    AnyAuthenticated,
    /// The caller must be the subject `target`, or privileged.
    SelfOrAdmin(i32),
    AdminOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Allowed, restricted to the caller's own resources.
    AllowSelf,
    Forbidden,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        !matches!(self, Decision::Forbidden)
    }
}

pub fn authorize(identity: &AuthorizationIdentity, requirement: Requirement) -> Decision {
    match requirement {
        Requirement::AnyAuthenticated => Decision::Allow,
        Requirement::SelfOrAdmin(_) if identity.privileged() => Decision::Allow,
        Requirement::SelfOrAdmin(target) if identity.subject_id() == target => Decision::AllowSelf,
        Requirement::SelfOrAdmin(_) => Decision::Forbidden,
        Requirement::AdminOnly if identity.privileged() => Decision::Allow,
        Requirement::AdminOnly => Decision::Forbidden,
    }
}

/// [`authorize`], with denial turned into a 403.
pub fn require(
    identity: &AuthorizationIdentity,
    requirement: Requirement,
) -> Result<Decision, ApiError> {
    match authorize(identity, requirement) {
        Decision::Forbidden => {
            tracing::info!(
                subject_id = identity.subject_id(),
                ?requirement,
                "request forbidden"
            );
            Err(ApiError::forbidden())
        }
        decision => Ok(decision),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: i32) -> AuthorizationIdentity {
        AuthorizationIdentity::for_testing(id, format!("user{id}@example.com"), false)
    }

    fn admin(id: i32) -> AuthorizationIdentity {
        AuthorizationIdentity::for_testing(id, format!("admin{id}@example.com"), true)
    }

    #[test]
    fn non_privileged_subject_matrix() {
        let five = member(5);
        assert_eq!(authorize(&five, Requirement::AnyAuthenticated), Decision::Allow);
        assert_eq!(authorize(&five, Requirement::SelfOrAdmin(5)), Decision::AllowSelf);
        assert_eq!(authorize(&five, Requirement::SelfOrAdmin(6)), Decision::Forbidden);
        assert_eq!(authorize(&five, Requirement::AdminOnly), Decision::Forbidden);
    }

    #[test]
    fn privileged_subject_is_allowed_everywhere() {
        let root = admin(1);
        for requirement in [
            Requirement::AnyAuthenticated,
            Requirement::SelfOrAdmin(1),
            Requirement::SelfOrAdmin(99),
            Requirement::AdminOnly,
        ] {
            assert_eq!(authorize(&root, requirement), Decision::Allow, "{requirement:?}");
        }
    }

    #[test]
    fn require_maps_denial_to_forbidden() {
        let err = require(&member(5), Requirement::AdminOnly).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(
            require(&member(5), Requirement::SelfOrAdmin(5)).unwrap(),
            Decision::AllowSelf
        );
        assert!(Decision::AllowSelf.is_allowed());
        assert!(!Decision::Forbidden.is_allowed());
    }
}
