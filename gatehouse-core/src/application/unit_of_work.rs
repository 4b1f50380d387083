use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

use sqlx::PgPool;

use crate::database::infrastructure::postgres::{
    PostgresPermissionsRepository, PostgresRolePermissionsRepository,
    PostgresRolesRepository, PostgresUserRolesRepository,
    PostgresUsersRepository,
};
use crate::database::ports::{
    PermissionsRepository, RolePermissionsRepository, RolesRepository,
    UserRolesRepository, UsersRepository,
};

/// Aggregates the repository ports used by application services.
///
/// Built once by the composition root and cloned cheaply into each service.
#[derive(Clone)]
pub struct AppUnitOfWork {
    pub users: Arc<dyn UsersRepository>,
    pub roles: Arc<dyn RolesRepository>,
    pub permissions: Arc<dyn PermissionsRepository>,
    pub role_permissions: Arc<dyn RolePermissionsRepository>,
    pub user_roles: Arc<dyn UserRolesRepository>,
}

impl fmt::Debug for AppUnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppUnitOfWork")
            .field("users", &type_name_of_val(self.users.as_ref()))
            .field("roles", &type_name_of_val(self.roles.as_ref()))
            .field("permissions", &type_name_of_val(self.permissions.as_ref()))
            .field(
                "role_permissions",
                &type_name_of_val(self.role_permissions.as_ref()),
            )
            .field("user_roles", &type_name_of_val(self.user_roles.as_ref()))
            .finish()
    }
}

impl AppUnitOfWork {
    /// Wire every port to its PostgreSQL adapter over a shared pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUsersRepository::new(pool.clone())),
            roles: Arc::new(PostgresRolesRepository::new(pool.clone())),
            permissions: Arc::new(PostgresPermissionsRepository::new(
                pool.clone(),
            )),
            role_permissions: Arc::new(
                PostgresRolePermissionsRepository::new(pool.clone()),
            ),
            user_roles: Arc::new(PostgresUserRolesRepository::new(pool)),
        }
    }

    /// Wire every port to one shared in-memory store.
    #[cfg(any(test, feature = "testing"))]
    pub fn in_memory() -> Self {
        use crate::database::infrastructure::memory::InMemoryStore;

        let store = InMemoryStore::new();
        Self {
            users: Arc::new(store.clone()),
            roles: Arc::new(store.clone()),
            permissions: Arc::new(store.clone()),
            role_permissions: Arc::new(store.clone()),
            user_roles: Arc::new(store),
        }
    }
}
