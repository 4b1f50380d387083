use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};

use super::permissions::PERMISSIONS;
use crate::database::infrastructure::postgres::{ActiveScope, map_db_error};
use crate::database::ports::rbac::RolePermissionsRepository;
use crate::domain::rbac::{Permission, RolePermission, RolePermissionPatch};
use crate::error::{CoreError, Result};

pub(crate) const ROLE_PERMISSIONS: ActiveScope = ActiveScope::new(
    "role_permissions",
    "id, role_id, permission_id, created_at, updated_at, deleted_at",
    "role permission",
);

#[derive(Clone, Debug)]
pub struct PostgresRolePermissionsRepository {
    pool: PgPool,
}

impl PostgresRolePermissionsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RolePermissionsRepository for PostgresRolePermissionsRepository {
    async fn create(&self, role_id: i64, permission_id: i64) -> Result<i64> {
        // Both endpoints must be active; a plain FK would accept deleted rows.
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, $2
            WHERE EXISTS (SELECT 1 FROM roles WHERE id = $1 AND deleted_at IS NULL)
              AND EXISTS (SELECT 1 FROM permissions WHERE id = $2 AND deleted_at IS NULL)
            RETURNING id
            "#,
        )
        .bind(role_id)
        .bind(permission_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(ROLE_PERMISSIONS.entity(), e))?;

        let id = id.ok_or_else(|| {
            CoreError::ForeignKeyViolation(ROLE_PERMISSIONS.entity().to_string())
        })?;

        info!(role_id, permission_id, "granted permission to role");
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> Result<RolePermission> {
        sqlx::query_as::<_, RolePermission>(
            &ROLE_PERMISSIONS.select_where("id = $1"),
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(ROLE_PERMISSIONS.entity(), e))
    }

    async fn get_all(&self) -> Result<Vec<RolePermission>> {
        sqlx::query_as::<_, RolePermission>(&ROLE_PERMISSIONS.select_all())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(ROLE_PERMISSIONS.entity(), e))
    }

    async fn update(
        &self,
        id: i64,
        patch: &RolePermissionPatch,
    ) -> Result<String> {
        let entity = ROLE_PERMISSIONS.entity();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_db_error(entity, e))?;

        let endpoints_active: bool = sqlx::query_scalar(
            r#"
            SELECT ($1::BIGINT IS NULL
                    OR EXISTS (SELECT 1 FROM roles WHERE id = $1 AND deleted_at IS NULL))
               AND ($2::BIGINT IS NULL
                    OR EXISTS (SELECT 1 FROM permissions WHERE id = $2 AND deleted_at IS NULL))
            "#,
        )
        .bind(patch.role_id)
        .bind(patch.permission_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_db_error(entity, e))?;

        if !endpoints_active {
            return Err(CoreError::ForeignKeyViolation(entity.to_string()));
        }

        let message = ROLE_PERMISSIONS
            .patch()
            .set("role_id", patch.role_id)
            .set("permission_id", patch.permission_id)
            .execute(&mut *tx, id)
            .await?;

        tx.commit().await.map_err(|e| map_db_error(entity, e))?;
        Ok(message)
    }

    async fn soft_delete(&self, id: i64) -> Result<String> {
        ROLE_PERMISSIONS.soft_delete(&self.pool, id).await
    }

    async fn hard_delete(&self, id: i64) -> Result<String> {
        ROLE_PERMISSIONS.hard_delete(&self.pool, id).await
    }

    async fn remove_permission_from_role(
        &self,
        role_id: i64,
        permission_id: i64,
    ) -> Result<String> {
        let result = sqlx::query(
            r#"
            UPDATE role_permissions
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE role_id = $1 AND permission_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(ROLE_PERMISSIONS.entity(), e))?;

        let message =
            ROLE_PERMISSIONS.outcome("Soft-deleted", result.rows_affected())?;
        info!(role_id, permission_id, "revoked permission from role");
        Ok(message)
    }

    async fn get_role_permissions(
        &self,
        role_id: i64,
    ) -> Result<Vec<Permission>> {
        let sql = format!(
            "SELECT {columns} FROM permissions p \
             JOIN role_permissions rp ON rp.permission_id = p.id \
             JOIN roles r ON r.id = rp.role_id \
             WHERE rp.role_id = $1 AND {p} AND {rp} AND {r} \
             ORDER BY p.id",
            columns = PERMISSIONS.qualified_columns("p"),
            p = ActiveScope::active("p"),
            rp = ActiveScope::active("rp"),
            r = ActiveScope::active("r"),
        );

        let permissions = sqlx::query_as::<_, Permission>(&sql)
            .bind(role_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(ROLE_PERMISSIONS.entity(), e))?;

        debug!(role_id, count = permissions.len(), "loaded role permissions");
        Ok(permissions)
    }
}
