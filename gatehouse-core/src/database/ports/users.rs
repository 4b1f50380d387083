use async_trait::async_trait;

use crate::domain::users::{NewUser, User, UserPatch};
use crate::error::Result;

// Identity records; every read sees active (non-deleted) rows only
#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Insert a user and return its id. Duplicate active email is
    /// `UniqueViolation`.
    async fn create(&self, user: &NewUser) -> Result<i64>;

    /// Insert a user and assign the named active role in one transaction.
    /// A missing role is `NotFound` and leaves no user row behind.
    async fn create_with_role(
        &self,
        user: &NewUser,
        role_name: &str,
    ) -> Result<i64>;

    async fn get_by_id(&self, id: i64) -> Result<User>;
    async fn get_by_email(&self, email: &str) -> Result<User>;
    async fn get_all(&self) -> Result<Vec<User>>;

    /// Patch the given fields; `NoRowsAffected` when `id` is not active.
    async fn update(&self, id: i64, patch: &UserPatch) -> Result<String>;

    async fn soft_delete(&self, id: i64) -> Result<String>;
    async fn hard_delete(&self, id: i64) -> Result<String>;
}
