use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::database::infrastructure::postgres::{ActiveScope, map_db_error};
use crate::database::ports::users::UsersRepository;
use crate::domain::users::{NewUser, User, UserPatch};
use crate::error::{CoreError, Result};

pub(crate) const USERS: ActiveScope = ActiveScope::new(
    "users",
    "id, name, email, password_hash, created_at, updated_at, deleted_at",
    "user",
);

/// PostgreSQL-backed implementation of the `UsersRepository` port.
#[derive(Clone, Debug)]
pub struct PostgresUsersRepository {
    pool: PgPool,
}

impl PostgresUsersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const INSERT_USER: &str = r#"
    INSERT INTO users (name, email, password_hash)
    VALUES ($1, $2, $3)
    RETURNING id
"#;

#[async_trait]
impl UsersRepository for PostgresUsersRepository {
    async fn create(&self, user: &NewUser) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(INSERT_USER)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_error(USERS.entity(), e))?;

        info!(user_id = id, "created user");
        Ok(id)
    }

    async fn create_with_role(
        &self,
        user: &NewUser,
        role_name: &str,
    ) -> Result<i64> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| map_db_error(USERS.entity(), e))?;

        let user_id: i64 = sqlx::query_scalar(INSERT_USER)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_db_error(USERS.entity(), e))?;

        let role_id: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM roles WHERE name = $1 AND deleted_at IS NULL",
        )
        .bind(role_name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_db_error("role", e))?;

        // Dropping `tx` rolls the user insert back.
        let Some(role_id) = role_id else {
            return Err(CoreError::NotFound(format!("role '{role_name}'")));
        };

        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_db_error("user role", e))?;

        tx.commit()
            .await
            .map_err(|e| map_db_error(USERS.entity(), e))?;

        info!(user_id, role = role_name, "created user with default role");
        Ok(user_id)
    }

    async fn get_by_id(&self, id: i64) -> Result<User> {
        debug!(user_id = id, "fetching user");
        sqlx::query_as::<_, User>(&USERS.select_where("id = $1"))
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_error(USERS.entity(), e))
    }

    async fn get_by_email(&self, email: &str) -> Result<User> {
        sqlx::query_as::<_, User>(&USERS.select_where("email = $1"))
            .bind(email)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_error(USERS.entity(), e))
    }

    async fn get_all(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&USERS.select_all())
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_db_error(USERS.entity(), e))?;

        debug!("Retrieved {} users", users.len());
        Ok(users)
    }

    async fn update(&self, id: i64, patch: &UserPatch) -> Result<String> {
        USERS
            .patch()
            .set("name", patch.name.clone())
            .set("email", patch.email.clone())
            .execute(self.pool(), id)
            .await
    }

    async fn soft_delete(&self, id: i64) -> Result<String> {
        USERS.soft_delete(self.pool(), id).await
    }

    async fn hard_delete(&self, id: i64) -> Result<String> {
        USERS.hard_delete(self.pool(), id).await
    }
}
