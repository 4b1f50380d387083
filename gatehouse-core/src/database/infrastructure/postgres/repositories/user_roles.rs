use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};

use super::permissions::PERMISSIONS;
use super::roles::ROLES;
use crate::database::infrastructure::postgres::{ActiveScope, map_db_error};
use crate::database::ports::rbac::UserRolesRepository;
use crate::domain::rbac::{
    Capability, Permission, Role, UserRole, UserRolePatch,
};
use crate::error::{CoreError, Result};

pub(crate) const USER_ROLES: ActiveScope = ActiveScope::new(
    "user_roles",
    "id, user_id, role_id, created_at, updated_at, deleted_at",
    "user role",
);

/// Joins from an active user through active assignments to active roles.
/// `$1` is the user id.
const ACTIVE_USER_ROLES_JOIN: &str = r#"
    FROM user_roles ur
    JOIN users u ON u.id = ur.user_id AND u.deleted_at IS NULL
    JOIN roles r ON r.id = ur.role_id AND r.deleted_at IS NULL
    WHERE ur.user_id = $1 AND ur.deleted_at IS NULL
"#;

/// Extends [`ACTIVE_USER_ROLES_JOIN`] to active grants and permissions.
const ACTIVE_USER_PERMISSIONS_JOIN: &str = r#"
    FROM user_roles ur
    JOIN users u ON u.id = ur.user_id AND u.deleted_at IS NULL
    JOIN roles r ON r.id = ur.role_id AND r.deleted_at IS NULL
    JOIN role_permissions rp ON rp.role_id = r.id AND rp.deleted_at IS NULL
    JOIN permissions p ON p.id = rp.permission_id AND p.deleted_at IS NULL
    WHERE ur.user_id = $1 AND ur.deleted_at IS NULL
"#;

#[derive(Clone, Debug)]
pub struct PostgresUserRolesRepository {
    pool: PgPool,
}

impl PostgresUserRolesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, sql: &str, user_id: i64, arg: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(sql)
            .bind(user_id)
            .bind(arg)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(USER_ROLES.entity(), e))
    }
}

#[async_trait]
impl UserRolesRepository for PostgresUserRolesRepository {
    async fn create(&self, user_id: i64, role_id: i64) -> Result<i64> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, $2
            WHERE EXISTS (SELECT 1 FROM users WHERE id = $1 AND deleted_at IS NULL)
              AND EXISTS (SELECT 1 FROM roles WHERE id = $2 AND deleted_at IS NULL)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(USER_ROLES.entity(), e))?;

        let id = id.ok_or_else(|| {
            CoreError::ForeignKeyViolation(USER_ROLES.entity().to_string())
        })?;

        info!(user_id, role_id, "assigned role to user");
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> Result<UserRole> {
        sqlx::query_as::<_, UserRole>(&USER_ROLES.select_where("id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(USER_ROLES.entity(), e))
    }

    async fn get_all(&self) -> Result<Vec<UserRole>> {
        sqlx::query_as::<_, UserRole>(&USER_ROLES.select_all())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(USER_ROLES.entity(), e))
    }

    async fn update(&self, id: i64, patch: &UserRolePatch) -> Result<String> {
        let entity = USER_ROLES.entity();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_db_error(entity, e))?;

        let endpoints_active: bool = sqlx::query_scalar(
            r#"
            SELECT ($1::BIGINT IS NULL
                    OR EXISTS (SELECT 1 FROM users WHERE id = $1 AND deleted_at IS NULL))
               AND ($2::BIGINT IS NULL
                    OR EXISTS (SELECT 1 FROM roles WHERE id = $2 AND deleted_at IS NULL))
            "#,
        )
        .bind(patch.user_id)
        .bind(patch.role_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_db_error(entity, e))?;

        if !endpoints_active {
            return Err(CoreError::ForeignKeyViolation(entity.to_string()));
        }

        let message = USER_ROLES
            .patch()
            .set("user_id", patch.user_id)
            .set("role_id", patch.role_id)
            .execute(&mut *tx, id)
            .await?;

        tx.commit().await.map_err(|e| map_db_error(entity, e))?;
        Ok(message)
    }

    async fn soft_delete(&self, id: i64) -> Result<String> {
        USER_ROLES.soft_delete(&self.pool, id).await
    }

    async fn hard_delete(&self, id: i64) -> Result<String> {
        USER_ROLES.hard_delete(&self.pool, id).await
    }

    async fn remove_role_from_user(
        &self,
        user_id: i64,
        role_id: i64,
    ) -> Result<String> {
        let result = sqlx::query(
            r#"
            UPDATE user_roles
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE user_id = $1 AND role_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(USER_ROLES.entity(), e))?;

        let message = USER_ROLES.outcome("Soft-deleted", result.rows_affected())?;
        info!(user_id, role_id, "removed role from user");
        Ok(message)
    }

    async fn get_user_roles(&self, user_id: i64) -> Result<Vec<Role>> {
        let sql = format!(
            "SELECT {} {ACTIVE_USER_ROLES_JOIN} ORDER BY r.id",
            ROLES.qualified_columns("r"),
        );

        sqlx::query_as::<_, Role>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(USER_ROLES.entity(), e))
    }

    async fn get_user_permissions(
        &self,
        user_id: i64,
    ) -> Result<Vec<Permission>> {
        // A permission granted through several roles is listed once.
        let sql = format!(
            "SELECT DISTINCT {} {ACTIVE_USER_PERMISSIONS_JOIN} ORDER BY p.id",
            PERMISSIONS.qualified_columns("p"),
        );

        let permissions = sqlx::query_as::<_, Permission>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(USER_ROLES.entity(), e))?;

        debug!(user_id, count = permissions.len(), "resolved user permissions");
        Ok(permissions)
    }

    async fn has_role(&self, user_id: i64, role_name: &str) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 {ACTIVE_USER_ROLES_JOIN} AND r.name = $2)"
        );
        self.exists(&sql, user_id, role_name).await
    }

    async fn has_permission(
        &self,
        user_id: i64,
        capability: &Capability,
    ) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 {ACTIVE_USER_PERMISSIONS_JOIN} \
             AND p.resource = $2 AND p.action = $3)"
        );

        sqlx::query_scalar::<_, bool>(&sql)
            .bind(user_id)
            .bind(&capability.resource)
            .bind(&capability.action)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(USER_ROLES.entity(), e))
    }

    async fn has_permission_named(
        &self,
        user_id: i64,
        permission_name: &str,
    ) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 {ACTIVE_USER_PERMISSIONS_JOIN} AND p.name = $2)"
        );
        self.exists(&sql, user_id, permission_name).await
    }

    async fn has_any_role(
        &self,
        user_id: i64,
        role_names: &[String],
    ) -> Result<bool> {
        if role_names.is_empty() {
            return Ok(false);
        }

        let sql = format!(
            "SELECT EXISTS (SELECT 1 {ACTIVE_USER_ROLES_JOIN} AND r.name = ANY($2))"
        );

        sqlx::query_scalar::<_, bool>(&sql)
            .bind(user_id)
            .bind(role_names)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(USER_ROLES.entity(), e))
    }

    async fn has_all_roles(
        &self,
        user_id: i64,
        role_names: &[String],
    ) -> Result<bool> {
        if role_names.is_empty() {
            return Ok(true);
        }

        let mut wanted = role_names.to_vec();
        wanted.sort();
        wanted.dedup();

        let sql = format!(
            "SELECT COUNT(DISTINCT r.name) {ACTIVE_USER_ROLES_JOIN} AND r.name = ANY($2)"
        );

        let held: i64 = sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(&wanted)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(USER_ROLES.entity(), e))?;

        Ok(held == wanted.len() as i64)
    }
}
