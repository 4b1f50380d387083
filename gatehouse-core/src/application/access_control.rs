//! Catalog and relationship operations over roles and permissions.
//!
//! Input is validated here before any store call; store errors pass through
//! unchanged.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::application::unit_of_work::AppUnitOfWork;
use crate::database::ports::{
    PermissionsRepository, RolePermissionsRepository, RolesRepository,
    UserRolesRepository,
};
use crate::domain::rbac::{
    NewPermission, NewRole, Permission, PermissionPatch, Role, RolePatch,
};
use crate::error::Result;

#[derive(Clone)]
pub struct AccessControl {
    roles: Arc<dyn RolesRepository>,
    permissions: Arc<dyn PermissionsRepository>,
    role_permissions: Arc<dyn RolePermissionsRepository>,
    user_roles: Arc<dyn UserRolesRepository>,
}

impl fmt::Debug for AccessControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessControl").finish_non_exhaustive()
    }
}

impl AccessControl {
    pub fn new(uow: &AppUnitOfWork) -> Self {
        Self {
            roles: Arc::clone(&uow.roles),
            permissions: Arc::clone(&uow.permissions),
            role_permissions: Arc::clone(&uow.role_permissions),
            user_roles: Arc::clone(&uow.user_roles),
        }
    }

    // Roles

    pub async fn create_role(&self, role: &NewRole) -> Result<i64> {
        let role = role.validated()?;
        self.roles.create(&role).await
    }

    pub async fn get_role(&self, id: i64) -> Result<Role> {
        self.roles.get_by_id(id).await
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        self.roles.get_all().await
    }

    pub async fn update_role(&self, id: i64, patch: &RolePatch) -> Result<String> {
        let patch = patch.validated()?;
        self.roles.update(id, &patch).await
    }

    pub async fn soft_delete_role(&self, id: i64) -> Result<String> {
        self.roles.soft_delete(id).await
    }

    // Permissions

    pub async fn create_permission(
        &self,
        permission: &NewPermission,
    ) -> Result<i64> {
        let permission = permission.validated()?;
        self.permissions.create(&permission).await
    }

    pub async fn get_permission(&self, id: i64) -> Result<Permission> {
        self.permissions.get_by_id(id).await
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>> {
        self.permissions.get_all().await
    }

    pub async fn update_permission(
        &self,
        id: i64,
        patch: &PermissionPatch,
    ) -> Result<String> {
        let patch = patch.validated()?;
        self.permissions.update(id, &patch).await
    }

    pub async fn soft_delete_permission(&self, id: i64) -> Result<String> {
        self.permissions.soft_delete(id).await
    }

    // Role <-> permission links

    pub async fn add_permission_to_role(
        &self,
        role_id: i64,
        permission_id: i64,
    ) -> Result<i64> {
        let id = self
            .role_permissions
            .add_permission_to_role(role_id, permission_id)
            .await?;
        info!(role_id, permission_id, "permission granted");
        Ok(id)
    }

    pub async fn remove_permission_from_role(
        &self,
        role_id: i64,
        permission_id: i64,
    ) -> Result<String> {
        let message = self
            .role_permissions
            .remove_permission_from_role(role_id, permission_id)
            .await?;
        info!(role_id, permission_id, "permission revoked");
        Ok(message)
    }

    pub async fn get_role_permissions(&self, role_id: i64) -> Result<Vec<Permission>> {
        self.role_permissions.get_role_permissions(role_id).await
    }

    // User <-> role links

    pub async fn assign_role_to_user(&self, user_id: i64, role_id: i64) -> Result<i64> {
        let id = self.user_roles.assign_role_to_user(user_id, role_id).await?;
        info!(user_id, role_id, "role assigned");
        Ok(id)
    }

    pub async fn remove_role_from_user(
        &self,
        user_id: i64,
        role_id: i64,
    ) -> Result<String> {
        let message = self.user_roles.remove_role_from_user(user_id, role_id).await?;
        info!(user_id, role_id, "role removed");
        Ok(message)
    }

    pub async fn get_user_roles(&self, user_id: i64) -> Result<Vec<Role>> {
        self.user_roles.get_user_roles(user_id).await
    }

    pub async fn get_user_permissions(&self, user_id: i64) -> Result<Vec<Permission>> {
        self.user_roles.get_user_permissions(user_id).await
    }
}
