use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::database::infrastructure::postgres::{ActiveScope, map_db_error};
use crate::database::ports::rbac::PermissionsRepository;
use crate::domain::rbac::{
    Capability, NewPermission, Permission, PermissionPatch,
};
use crate::error::Result;

pub(crate) const PERMISSIONS: ActiveScope = ActiveScope::new(
    "permissions",
    "id, name, description, resource, action, created_at, updated_at, deleted_at",
    "permission",
);

#[derive(Clone, Debug)]
pub struct PostgresPermissionsRepository {
    pool: PgPool,
}

impl PostgresPermissionsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionsRepository for PostgresPermissionsRepository {
    async fn create(&self, permission: &NewPermission) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO permissions (name, description, resource, action)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&permission.name)
        .bind(&permission.description)
        .bind(&permission.resource)
        .bind(&permission.action)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(PERMISSIONS.entity(), e))?;

        info!(permission_id = id, name = %permission.name, "created permission");
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> Result<Permission> {
        sqlx::query_as::<_, Permission>(&PERMISSIONS.select_where("id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(PERMISSIONS.entity(), e))
    }

    async fn get_by_name(&self, name: &str) -> Result<Permission> {
        sqlx::query_as::<_, Permission>(&PERMISSIONS.select_where("name = $1"))
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(PERMISSIONS.entity(), e))
    }

    async fn get_by_capability(
        &self,
        capability: &Capability,
    ) -> Result<Permission> {
        sqlx::query_as::<_, Permission>(
            &PERMISSIONS.select_where("resource = $1 AND action = $2"),
        )
        .bind(&capability.resource)
        .bind(&capability.action)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(PERMISSIONS.entity(), e))
    }

    async fn get_all(&self) -> Result<Vec<Permission>> {
        sqlx::query_as::<_, Permission>(&PERMISSIONS.select_all())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(PERMISSIONS.entity(), e))
    }

    async fn update(
        &self,
        id: i64,
        patch: &PermissionPatch,
    ) -> Result<String> {
        PERMISSIONS
            .patch()
            .set("name", patch.name.clone())
            .set("description", patch.description.clone())
            .set("resource", patch.resource.clone())
            .set("action", patch.action.clone())
            .execute(&self.pool, id)
            .await
    }

    async fn soft_delete(&self, id: i64) -> Result<String> {
        PERMISSIONS.soft_delete(&self.pool, id).await
    }

    async fn hard_delete(&self, id: i64) -> Result<String> {
        PERMISSIONS.hard_delete(&self.pool, id).await
    }
}
