use async_trait::async_trait;

use crate::domain::rbac::{
    Capability, NewPermission, NewRole, Permission, PermissionPatch, Role,
    RolePatch, RolePermission, RolePermissionPatch, UserRole, UserRolePatch,
};
use crate::error::Result;

#[async_trait]
pub trait RolesRepository: Send + Sync {
    async fn create(&self, role: &NewRole) -> Result<i64>;
    async fn get_by_id(&self, id: i64) -> Result<Role>;
    async fn get_by_name(&self, name: &str) -> Result<Role>;
    async fn get_all(&self) -> Result<Vec<Role>>;
    async fn update(&self, id: i64, patch: &RolePatch) -> Result<String>;
    async fn soft_delete(&self, id: i64) -> Result<String>;
    async fn hard_delete(&self, id: i64) -> Result<String>;
}

#[async_trait]
pub trait PermissionsRepository: Send + Sync {
    async fn create(&self, permission: &NewPermission) -> Result<i64>;
    async fn get_by_id(&self, id: i64) -> Result<Permission>;
    async fn get_by_name(&self, name: &str) -> Result<Permission>;
    async fn get_by_capability(
        &self,
        capability: &Capability,
    ) -> Result<Permission>;
    async fn get_all(&self) -> Result<Vec<Permission>>;
    async fn update(
        &self,
        id: i64,
        patch: &PermissionPatch,
    ) -> Result<String>;
    async fn soft_delete(&self, id: i64) -> Result<String>;
    async fn hard_delete(&self, id: i64) -> Result<String>;
}

#[async_trait]
pub trait RolePermissionsRepository: Send + Sync {
    /// Link an active role to an active permission. An inactive or missing
    /// endpoint is `ForeignKeyViolation`; an existing active link is
    /// `UniqueViolation`.
    async fn create(&self, role_id: i64, permission_id: i64) -> Result<i64>;
    async fn get_by_id(&self, id: i64) -> Result<RolePermission>;
    async fn get_all(&self) -> Result<Vec<RolePermission>>;
    async fn update(
        &self,
        id: i64,
        patch: &RolePermissionPatch,
    ) -> Result<String>;
    async fn soft_delete(&self, id: i64) -> Result<String>;
    async fn hard_delete(&self, id: i64) -> Result<String>;

    async fn add_permission_to_role(
        &self,
        role_id: i64,
        permission_id: i64,
    ) -> Result<i64> {
        self.create(role_id, permission_id).await
    }

    /// Soft-delete the active link; `NoRowsAffected` when none exists.
    async fn remove_permission_from_role(
        &self,
        role_id: i64,
        permission_id: i64,
    ) -> Result<String>;

    /// Active permissions linked to an active role.
    async fn get_role_permissions(&self, role_id: i64)
    -> Result<Vec<Permission>>;
}

#[async_trait]
pub trait UserRolesRepository: Send + Sync {
    async fn create(&self, user_id: i64, role_id: i64) -> Result<i64>;
    async fn get_by_id(&self, id: i64) -> Result<UserRole>;
    async fn get_all(&self) -> Result<Vec<UserRole>>;
    async fn update(&self, id: i64, patch: &UserRolePatch) -> Result<String>;
    async fn soft_delete(&self, id: i64) -> Result<String>;
    async fn hard_delete(&self, id: i64) -> Result<String>;

    async fn assign_role_to_user(
        &self,
        user_id: i64,
        role_id: i64,
    ) -> Result<i64> {
        self.create(user_id, role_id).await
    }

    async fn remove_role_from_user(
        &self,
        user_id: i64,
        role_id: i64,
    ) -> Result<String>;

    /// Active roles held by an active user.
    async fn get_user_roles(&self, user_id: i64) -> Result<Vec<Role>>;

    /// Active permissions reachable through the user's active roles, each
    /// permission listed once.
    async fn get_user_permissions(&self, user_id: i64)
    -> Result<Vec<Permission>>;

    async fn has_role(&self, user_id: i64, role_name: &str) -> Result<bool>;

    async fn has_permission(
        &self,
        user_id: i64,
        capability: &Capability,
    ) -> Result<bool>;

    async fn has_permission_named(
        &self,
        user_id: i64,
        permission_name: &str,
    ) -> Result<bool>;

    /// True on the first held role; `false` for an empty list.
    async fn has_any_role(
        &self,
        user_id: i64,
        role_names: &[String],
    ) -> Result<bool> {
        for name in role_names {
            if self.has_role(user_id, name).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// False on the first missing role; `true` for an empty list.
    async fn has_all_roles(
        &self,
        user_id: i64,
        role_names: &[String],
    ) -> Result<bool> {
        for name in role_names {
            if !self.has_role(user_id, name).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
