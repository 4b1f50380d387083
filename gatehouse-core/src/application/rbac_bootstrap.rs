use std::{fmt, sync::Arc};

use tracing::{info, warn};

use crate::{
    application::unit_of_work::AppUnitOfWork,
    database::ports::{
        PermissionsRepository, RolePermissionsRepository, RolesRepository,
        UserRolesRepository, UsersRepository,
    },
    domain::{
        rbac::{self, Capability, NewPermission, NewRole},
        validation::Email,
    },
    error::{CoreError, Result},
};

/// Seeds the administrator role and the permission that guards RBAC
/// management. Safe to run on every startup.
pub struct RbacBootstrapService {
    users: Arc<dyn UsersRepository>,
    roles: Arc<dyn RolesRepository>,
    permissions: Arc<dyn PermissionsRepository>,
    role_permissions: Arc<dyn RolePermissionsRepository>,
    user_roles: Arc<dyn UserRolesRepository>,
}

impl fmt::Debug for RbacBootstrapService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RbacBootstrapService")
            .field("roles", &"Arc<dyn RolesRepository>")
            .field("permissions", &"Arc<dyn PermissionsRepository>")
            .finish_non_exhaustive()
    }
}

impl RbacBootstrapService {
    pub fn new(uow: &AppUnitOfWork) -> Self {
        Self {
            users: Arc::clone(&uow.users),
            roles: Arc::clone(&uow.roles),
            permissions: Arc::clone(&uow.permissions),
            role_permissions: Arc::clone(&uow.role_permissions),
            user_roles: Arc::clone(&uow.user_roles),
        }
    }

    /// Ensure `admin`, `rbac:manage` and the grant between them exist.
    /// Returns the admin role id.
    pub async fn ensure_defaults(&self) -> Result<i64> {
        let admin_id = match self.roles.get_by_name(rbac::roles::ADMIN).await {
            Ok(role) => role.id,
            Err(CoreError::NotFound(_)) => {
                let id = self
                    .roles
                    .create(&NewRole {
                        name: rbac::roles::ADMIN.to_string(),
                        description: "Full access to role and permission management"
                            .to_string(),
                    })
                    .await?;
                info!(role_id = id, "created admin role");
                id
            }
            Err(err) => return Err(err),
        };

        let capability = Capability::new(
            rbac::permissions::RBAC_RESOURCE,
            rbac::permissions::MANAGE_ACTION,
        );
        let manage_id = match self.permissions.get_by_capability(&capability).await {
            Ok(permission) => permission.id,
            Err(CoreError::NotFound(_)) => {
                let id = self
                    .permissions
                    .create(&NewPermission {
                        name: rbac::permissions::RBAC_MANAGE.to_string(),
                        description: "Manage roles, permissions and assignments"
                            .to_string(),
                        resource: capability.resource.clone(),
                        action: capability.action.clone(),
                    })
                    .await?;
                info!(permission_id = id, "created rbac:manage permission");
                id
            }
            Err(err) => return Err(err),
        };

        match self
            .role_permissions
            .add_permission_to_role(admin_id, manage_id)
            .await
        {
            Ok(_) | Err(CoreError::UniqueViolation(_)) => {}
            Err(err) => return Err(err),
        }

        Ok(admin_id)
    }

    /// Give the active user with `email` the admin role.
    ///
    /// The email is normalized the same way registration stores it.
    /// Returns `false` when no such user exists yet.
    pub async fn promote_admin(&self, email: &str) -> Result<bool> {
        let email = Email::parse(email)?;
        let admin_id = self.ensure_defaults().await?;

        let user = match self.users.get_by_email(email.as_str()).await {
            Ok(user) => user,
            Err(CoreError::NotFound(_)) => {
                warn!("bootstrap admin email does not match an active user");
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        match self.user_roles.assign_role_to_user(user.id, admin_id).await {
            Ok(_) => info!(user_id = user.id, "granted admin role"),
            Err(CoreError::UniqueViolation(_)) => {}
            Err(err) => return Err(err),
        }
        Ok(true)
    }
}
