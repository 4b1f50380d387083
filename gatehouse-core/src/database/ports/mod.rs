//! Repository ports consumed by the application services.
//!
//! Each trait is implemented by a PostgreSQL adapter and, behind the
//! `testing` feature, by an in-memory adapter with the same semantics.

pub mod rbac;
pub mod users;

pub use rbac::{
    PermissionsRepository, RolePermissionsRepository, RolesRepository,
    UserRolesRepository,
};
pub use users::UsersRepository;
