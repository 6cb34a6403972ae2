use tracing::error;
use uuid::Uuid;

use crates::domain::value_objects::enums::user_roles::UserRole;

use super::AuthUser;
use crate::axum_http::error_responses::AppError;

/// Any user that belongs to a tenant. Returns the tenant id.
pub fn require_tenant_user(user: &AuthUser) -> Result<Uuid, AppError> {
    if user.role == UserRole::PlatformAdmin {
        return Err(AppError::Forbidden(
            "Platform admins cannot access tenant routes".to_string(),
        ));
    }

    user.tenant_id
        .ok_or_else(|| AppError::Forbidden("No tenant associated with this user".to_string()))
}

pub fn require_owner(user: &AuthUser) -> Result<Uuid, AppError> {
    let tenant_id = require_tenant_user(user)?;

    if user.role != UserRole::Owner {
        return Err(AppError::Forbidden(
            "Only the tenant owner can perform this action".to_string(),
        ));
    }

    Ok(tenant_id)
}

pub fn require_platform_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.role != UserRole::PlatformAdmin {
        return Err(AppError::Forbidden(
            "Platform admin access required".to_string(),
        ));
    }

    if user.tenant_id.is_some() {
        error!(user_id = %user.user_id, "auth: platform admin is attached to a tenant");
        return Err(AppError::Forbidden(
            "Platform admin account is misconfigured".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole, tenant_id: Option<Uuid>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            tenant_id,
            email: "someone@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn tenant_user_needs_a_tenant() {
        let tenant_id = Uuid::new_v4();

        assert_eq!(
            require_tenant_user(&user(UserRole::Cashier, Some(tenant_id))).unwrap(),
            tenant_id
        );
        assert!(matches!(
            require_tenant_user(&user(UserRole::Cashier, None)),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            require_tenant_user(&user(UserRole::PlatformAdmin, None)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn owner_guard_rejects_other_roles() {
        let tenant_id = Uuid::new_v4();

        assert!(require_owner(&user(UserRole::Owner, Some(tenant_id))).is_ok());
        assert!(matches!(
            require_owner(&user(UserRole::Manager, Some(tenant_id))),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn platform_admin_with_tenant_is_rejected() {
        assert!(require_platform_admin(&user(UserRole::PlatformAdmin, None)).is_ok());
        assert!(require_platform_admin(&user(UserRole::PlatformAdmin, Some(Uuid::new_v4()))).is_err());
        assert!(require_platform_admin(&user(UserRole::Owner, Some(Uuid::new_v4()))).is_err());
    }
}
