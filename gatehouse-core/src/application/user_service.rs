use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::application::unit_of_work::AppUnitOfWork;
use crate::database::ports::UsersRepository;
use crate::domain::users::{User, UserPatch};
use crate::error::Result;

/// Identity record management for already-authenticated callers.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UsersRepository>,
}

impl fmt::Debug for UserService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserService").finish_non_exhaustive()
    }
}

impl UserService {
    pub fn new(uow: &AppUnitOfWork) -> Self {
        Self {
            users: Arc::clone(&uow.users),
        }
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        self.users.get_by_id(id).await
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        self.users.get_all().await
    }

    pub async fn update(&self, id: i64, patch: &UserPatch) -> Result<String> {
        let patch = patch.validated()?;
        let message = self.users.update(id, &patch).await?;
        info!(user_id = id, "updated user");
        Ok(message)
    }

    pub async fn soft_delete(&self, id: i64) -> Result<String> {
        self.users.soft_delete(id).await
    }

    pub async fn hard_delete(&self, id: i64) -> Result<String> {
        self.users.hard_delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::users::NewUser;
    use crate::error::CoreError;

    async fn seeded() -> (UserService, i64) {
        let uow = AppUnitOfWork::in_memory();
        let id = uow
            .users
            .create(&NewUser {
                name: "Alice".into(),
                email: "alice@example.com".into(),
                password_hash: "$argon2id$stub".into(),
            })
            .await
            .unwrap();
        (UserService::new(&uow), id)
    }

    #[tokio::test]
    async fn update_normalizes_email() {
        let (users, id) = seeded().await;
        let patch = UserPatch {
            name: None,
            email: Some(" Alice@Example.org ".into()),
        };

        users.update(id, &patch).await.unwrap();
        let user = users.get(id).await.unwrap();
        assert_eq!(user.email, "alice@example.org");
        assert_eq!(user.name, "Alice");
    }

    #[tokio::test]
    async fn soft_deleted_users_disappear_from_reads() {
        let (users, id) = seeded().await;
        users.soft_delete(id).await.unwrap();

        assert!(users.list().await.unwrap().is_empty());
        assert!(matches!(users.get(id).await, Err(CoreError::NotFound(_))));
        assert!(matches!(
            users.soft_delete(id).await,
            Err(CoreError::NoRowsAffected(_))
        ));
    }

    #[tokio::test]
    async fn hard_delete_bypasses_the_active_filter() {
        let (users, id) = seeded().await;
        users.soft_delete(id).await.unwrap();

        users.hard_delete(id).await.unwrap();
        assert!(matches!(
            users.hard_delete(id).await,
            Err(CoreError::NoRowsAffected(_))
        ));
    }
}
