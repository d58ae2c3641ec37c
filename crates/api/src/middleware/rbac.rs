//! Permission checks on top of [`AuthUser`].
//!
//! Permissions are `ACTION_ENTITY` codes (`READ_SAVINGSACCOUNT`,
//! `APPROVE_FIXEDDEPOSITACCOUNT`, ...). Most actions are only known once the
//! `?command=` parameter has been parsed, so the check runs inside handlers:
//!
//! ```ignore
//! async fn approve(user: AuthUser) -> AppResult<StatusCode> {
//!     user.require_permission("APPROVE", ENTITY_SAVINGS_ACCOUNT)?;
//!     Ok(StatusCode::OK)
//! }
//! ```

use savings_core::error::CoreError;
use savings_core::permissions::{has_permission, permission_code};

use super::auth::AuthUser;
use crate::error::AppError;

pub trait RequirePermission {
    /// Reject with 403 Forbidden unless the caller holds `ACTION_ENTITY`.
    fn require_permission(&self, action: &str, entity: &str) -> Result<(), AppError>;

    fn require_read(&self, entity: &str) -> Result<(), AppError> {
        self.require_permission("READ", entity)
    }
}

impl RequirePermission for AuthUser {
    fn require_permission(&self, action: &str, entity: &str) -> Result<(), AppError> {
        if has_permission(&self.role, action, entity) {
            return Ok(());
        }
        tracing::warn!(
            user_id = self.user_id,
            role = %self.role,
            permission = %permission_code(action, entity),
            "Permission denied"
        );
        Err(AppError::Core(CoreError::Forbidden(format!(
            "User has no authority to: {}",
            permission_code(action, entity)
        ))))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use savings_core::permissions::{
        ENTITY_SAVINGS_ACCOUNT, ENTITY_SAVINGS_PRODUCT, ROLE_AUDITOR, ROLE_OFFICER,
    };

    use super::*;

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: 1,
            role: role.to_string(),
        }
    }

    #[test]
    fn auditor_reads_but_cannot_deposit() {
        let auditor = user(ROLE_AUDITOR);
        assert!(auditor.require_read(ENTITY_SAVINGS_ACCOUNT).is_ok());
        assert_matches!(
            auditor.require_permission("DEPOSIT", ENTITY_SAVINGS_ACCOUNT),
            Err(AppError::Core(CoreError::Forbidden(msg))) if msg.ends_with("DEPOSIT_SAVINGSACCOUNT")
        );
    }

    #[test]
    fn officer_cannot_create_products() {
        assert!(user(ROLE_OFFICER)
            .require_permission("CREATE", ENTITY_SAVINGS_PRODUCT)
            .is_err());
    }

    #[test]
    fn unknown_role_has_no_permissions() {
        assert!(user("guest").require_read(ENTITY_SAVINGS_ACCOUNT).is_err());
    }
}
