//! Role-Based Access Control data model
//!
//! Permissions are granted to roles and roles to users. A user's effective
//! permissions are every active permission reachable through an active
//! role assignment.
//!
//! ## Overview
//!
//! - **Roles**: named collections of permissions (e.g. `admin`, `editor`)
//! - **Permissions**: a `(resource, action)` capability with a unique name
//! - **Role permissions**: association rows linking roles to permissions
//! - **User roles**: association rows linking users to roles
//!
//! Association rows are created by an explicit assign and soft-deleted by an
//! explicit revoke; nothing cascades.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::validation::ValidationError;

/// A role that can be assigned to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: i64,
    /// Unique among active roles (e.g. "admin", "editor")
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A capability on a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    pub id: i64,
    /// Unique among active permissions (e.g. "articles:write")
    pub name: String,
    pub description: String,
    /// Resource identifier (e.g. "articles")
    pub resource: String,
    /// Action identifier (e.g. "write")
    pub action: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Permission {
    pub fn capability(&self) -> Capability {
        Capability::new(&self.resource, &self.action)
    }
}

/// Association between a role and a permission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RolePermission {
    pub id: i64,
    pub role_id: i64,
    pub permission_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Association between a user and a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRole {
    pub id: i64,
    pub user_id: i64,
    pub role_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPermission {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub resource: String,
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionPatch {
    pub role_id: Option<i64>,
    pub permission_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRolePatch {
    pub user_id: Option<i64>,
    pub role_id: Option<i64>,
}

/// `(resource, action)` pair identifying what a permission allows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    pub resource: String,
    pub action: String,
}

impl Capability {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Parse the `resource:action` form used in permission names.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.split_once(':') {
            Some((resource, action))
                if !resource.trim().is_empty() && !action.trim().is_empty() =>
            {
                Ok(Self::new(resource.trim(), action.trim()))
            }
            _ => Err(ValidationError::InvalidCapability(value.to_string())),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

/// Well-known role names
pub mod roles {
    pub const ADMIN: &str = "admin";
}

/// Well-known permission constants
pub mod permissions {
    pub const RBAC_RESOURCE: &str = "rbac";
    pub const MANAGE_ACTION: &str = "manage";
    pub const RBAC_MANAGE: &str = "rbac:manage";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_parses_resource_and_action() {
        let cap = Capability::parse("articles:write").unwrap();
        assert_eq!(cap, Capability::new("articles", "write"));
        assert_eq!(cap.to_string(), "articles:write");
    }

    #[test]
    fn capability_rejects_incomplete_forms() {
        assert!(Capability::parse("articles").is_err());
        assert!(Capability::parse(":write").is_err());
        assert!(Capability::parse("articles: ").is_err());
    }
}
