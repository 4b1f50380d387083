use sqlx::{Encode, PgExecutor, PgPool, Postgres, QueryBuilder, Type};
use tracing::info;

use super::map_db_error;
use crate::error::{CoreError, Result};

/// Statement factory for one soft-deletable table.
///
/// Every read, patch and soft delete it produces is restricted to rows with
/// `deleted_at IS NULL`. `hard_delete` is the only statement that is not.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ActiveScope {
    table: &'static str,
    columns: &'static str,
    entity: &'static str,
}

impl ActiveScope {
    pub(crate) const fn new(
        table: &'static str,
        columns: &'static str,
        entity: &'static str,
    ) -> Self {
        Self {
            table,
            columns,
            entity,
        }
    }

    pub(crate) fn entity(&self) -> &'static str {
        self.entity
    }

    /// `SELECT <columns> FROM <table> WHERE deleted_at IS NULL`
    pub(crate) fn select(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE deleted_at IS NULL",
            self.columns, self.table
        )
    }

    /// Active rows matching an extra predicate, e.g. `"id = $1"`.
    pub(crate) fn select_where(&self, predicate: &str) -> String {
        format!("{} AND {}", self.select(), predicate)
    }

    /// Active rows ordered by id, as returned by `get_all`.
    pub(crate) fn select_all(&self) -> String {
        format!("{} ORDER BY id", self.select())
    }

    /// Column list prefixed with `alias`, for joins.
    pub(crate) fn qualified_columns(&self, alias: &str) -> String {
        self.columns
            .split(", ")
            .map(|column| format!("{alias}.{column}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `<alias>.deleted_at IS NULL`, for joins through this table.
    pub(crate) fn active(alias: &str) -> String {
        format!("{alias}.deleted_at IS NULL")
    }

    /// Begin a partial update. `updated_at` is always refreshed.
    pub(crate) fn patch(&self) -> Patch {
        Patch {
            builder: QueryBuilder::new(format!(
                "UPDATE {} SET updated_at = NOW()",
                self.table
            )),
            scope: *self,
        }
    }

    pub(crate) fn soft_delete_sql(&self) -> String {
        format!(
            "UPDATE {} SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
            self.table
        )
    }

    pub(crate) async fn soft_delete(&self, pool: &PgPool, id: i64) -> Result<String> {
        let result = sqlx::query(&self.soft_delete_sql())
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| map_db_error(self.entity, e))?;

        let message = self.outcome("Soft-deleted", result.rows_affected())?;
        info!(entity = self.entity, id, "soft-deleted");
        Ok(message)
    }

    pub(crate) async fn hard_delete(&self, pool: &PgPool, id: i64) -> Result<String> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.table))
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| map_db_error(self.entity, e))?;

        let message = self.outcome("Deleted", result.rows_affected())?;
        info!(entity = self.entity, id, "hard-deleted");
        Ok(message)
    }

    /// Turn an affected-row count into the store's message or `NoRowsAffected`.
    pub(crate) fn outcome(&self, verb: &str, rows: u64) -> Result<String> {
        if rows == 0 {
            return Err(CoreError::NoRowsAffected(self.entity.to_string()));
        }
        Ok(format!("{verb} {} (rows affected: {rows})", self.entity))
    }
}

/// Partial `UPDATE` under construction; only `Some` values are written.
pub(crate) struct Patch {
    builder: QueryBuilder<'static, Postgres>,
    scope: ActiveScope,
}

impl Patch {
    pub(crate) fn set<T>(mut self, column: &str, value: Option<T>) -> Self
    where
        T: 'static + Encode<'static, Postgres> + Type<Postgres>,
    {
        if let Some(value) = value {
            self.builder.push(", ").push(column).push(" = ").push_bind(value);
        }
        self
    }

    pub(crate) async fn execute<'e, E>(mut self, executor: E, id: i64) -> Result<String>
    where
        E: PgExecutor<'e>,
    {
        let entity = self.scope.entity;
        self.builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND deleted_at IS NULL");

        let result = self
            .builder
            .build()
            .execute(executor)
            .await
            .map_err(|e| map_db_error(entity, e))?;

        let message = self.scope.outcome("Updated", result.rows_affected())?;
        info!(entity, id, "updated");
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: ActiveScope =
        ActiveScope::new("roles", "id, name", "role");

    #[test]
    fn reads_are_restricted_to_active_rows() {
        assert_eq!(
            ROLES.select_where("name = $1"),
            "SELECT id, name FROM roles WHERE deleted_at IS NULL AND name = $1"
        );
        assert!(ROLES.select_all().ends_with("ORDER BY id"));
    }

    #[test]
    fn qualified_columns_carry_the_alias() {
        assert_eq!(ROLES.qualified_columns("r"), "r.id, r.name");
        assert_eq!(ActiveScope::active("r"), "r.deleted_at IS NULL");
    }

    #[test]
    fn soft_delete_only_touches_active_rows() {
        assert!(ROLES.soft_delete_sql().ends_with("deleted_at IS NULL"));
    }

    #[test]
    fn patch_always_refreshes_updated_at() {
        let patch = ROLES
            .patch()
            .set("name", Some("editor".to_string()))
            .set::<String>("description", None);
        assert_eq!(
            patch.builder.sql(),
            "UPDATE roles SET updated_at = NOW(), name = $1"
        );
    }

    #[test]
    fn zero_rows_is_no_rows_affected() {
        assert!(matches!(
            ROLES.outcome("Updated", 0),
            Err(CoreError::NoRowsAffected(ref e)) if e == "role"
        ));
        assert_eq!(
            ROLES.outcome("Updated", 1).unwrap(),
            "Updated role (rows affected: 1)"
        );
    }
}
