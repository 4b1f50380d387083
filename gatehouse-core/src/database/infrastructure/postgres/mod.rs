//! PostgreSQL infrastructure adapters implementing the database ports.

pub mod repositories;
mod scope;

pub(crate) use scope::ActiveScope;

pub use repositories::permissions::PostgresPermissionsRepository;
pub use repositories::role_permissions::PostgresRolePermissionsRepository;
pub use repositories::roles::PostgresRolesRepository;
pub use repositories::user_roles::PostgresUserRolesRepository;
pub use repositories::users::PostgresUsersRepository;

use sqlx::error::ErrorKind;
use tracing::{debug, error};

use crate::error::CoreError;

/// Normalize a driver error into the core taxonomy.
///
/// Constraint failures keep only the entity name; the driver text goes to
/// the log and never into the returned error.
pub(crate) fn map_db_error(entity: &str, err: sqlx::Error) -> CoreError {
    let entity_name = entity.to_string();

    let db_err = match &err {
        sqlx::Error::RowNotFound => return CoreError::NotFound(entity_name),
        sqlx::Error::Database(db_err) => db_err,
        other => {
            error!(entity, error = %other, "database operation failed");
            return CoreError::Database(entity_name);
        }
    };

    match db_err.kind() {
        ErrorKind::UniqueViolation => {
            debug!(entity, constraint = ?db_err.constraint(), "unique violation");
            CoreError::UniqueViolation(entity_name)
        }
        ErrorKind::ForeignKeyViolation => {
            debug!(entity, constraint = ?db_err.constraint(), "foreign key violation");
            CoreError::ForeignKeyViolation(entity_name)
        }
        ErrorKind::NotNullViolation => {
            debug!(entity, "not null violation");
            CoreError::NotNullViolation(entity_name)
        }
        _ => {
            error!(entity, code = ?db_err.code(), error = %db_err, "database error");
            CoreError::Database(entity_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = map_db_error("role", sqlx::Error::RowNotFound);
        assert!(matches!(err, CoreError::NotFound(ref e) if e == "role"));
    }

    #[test]
    fn driver_text_never_reaches_the_message() {
        let err = map_db_error(
            "user",
            sqlx::Error::Protocol("secret driver detail".into()),
        );
        assert!(matches!(err, CoreError::Database(_)));
        assert!(!err.to_string().contains("secret driver detail"));
    }
}
