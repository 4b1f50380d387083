use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::database::infrastructure::postgres::{ActiveScope, map_db_error};
use crate::database::ports::rbac::RolesRepository;
use crate::domain::rbac::{NewRole, Role, RolePatch};
use crate::error::Result;

pub(crate) const ROLES: ActiveScope = ActiveScope::new(
    "roles",
    "id, name, description, created_at, updated_at, deleted_at",
    "role",
);

#[derive(Clone, Debug)]
pub struct PostgresRolesRepository {
    pool: PgPool,
}

impl PostgresRolesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RolesRepository for PostgresRolesRepository {
    async fn create(&self, role: &NewRole) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(&role.name)
        .bind(&role.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(ROLES.entity(), e))?;

        info!(role_id = id, name = %role.name, "created role");
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> Result<Role> {
        sqlx::query_as::<_, Role>(&ROLES.select_where("id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(ROLES.entity(), e))
    }

    async fn get_by_name(&self, name: &str) -> Result<Role> {
        sqlx::query_as::<_, Role>(&ROLES.select_where("name = $1"))
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(ROLES.entity(), e))
    }

    async fn get_all(&self) -> Result<Vec<Role>> {
        sqlx::query_as::<_, Role>(&ROLES.select_all())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(ROLES.entity(), e))
    }

    async fn update(&self, id: i64, patch: &RolePatch) -> Result<String> {
        ROLES
            .patch()
            .set("name", patch.name.clone())
            .set("description", patch.description.clone())
            .execute(&self.pool, id)
            .await
    }

    async fn soft_delete(&self, id: i64) -> Result<String> {
        ROLES.soft_delete(&self.pool, id).await
    }

    async fn hard_delete(&self, id: i64) -> Result<String> {
        ROLES.hard_delete(&self.pool, id).await
    }
}
