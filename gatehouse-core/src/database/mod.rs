pub mod infrastructure;
pub mod ports;

pub use infrastructure::postgres::{
    PostgresPermissionsRepository, PostgresRolePermissionsRepository,
    PostgresRolesRepository, PostgresUserRolesRepository,
    PostgresUsersRepository,
};
