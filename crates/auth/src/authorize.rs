use thiserror::Error;

use shopledger_core::DomainError;

use crate::{Identity, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Insufficient permissions: requires {required} or above, caller is {actual}")]
    BelowMinimum { required: Role, actual: Role },

    #[error("Insufficient permissions: role {actual} is not allowed")]
    RoleNotAllowed { actual: Role },
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::forbidden(value.to_string())
    }
}

/// Whether `identity` holds at least the `required` role level.
///
/// - No IO
/// - No panics
pub fn is_authorized(identity: &Identity, required: Role) -> bool {
    identity.role.level() >= required.level()
}

/// Minimum-role gate used in front of every ledger mutation.
pub fn require_min_role(identity: &Identity, required: Role) -> Result<(), AuthzError> {
    if is_authorized(identity, required) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %identity.user_id,
            role = %identity.role,
            required = %required,
            "authorization denied"
        );
        Err(AuthzError::BelowMinimum {
            required,
            actual: identity.role,
        })
    }
}

/// Exact-role gate (e.g. user management is ADMIN only).
pub fn require_role(identity: &Identity, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %identity.user_id,
            role = %identity.role,
            "authorization denied"
        );
        Err(AuthzError::RoleNotAllowed {
            actual: identity.role,
        })
    }
}
