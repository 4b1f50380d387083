//! In-memory implementation of every repository port.
//!
//! Mirrors the PostgreSQL adapters: active-row uniqueness, association
//! endpoints must be active, `NoRowsAffected` for inactive targets and
//! restricted hard deletes while association rows still reference a record.
//! Intended for tests and for embedding the services without a database.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::info;

use crate::database::ports::rbac::{
    PermissionsRepository, RolePermissionsRepository, RolesRepository,
    UserRolesRepository,
};
use crate::database::ports::users::UsersRepository;
use crate::domain::rbac::{
    Capability, NewPermission, NewRole, Permission, PermissionPatch, Role,
    RolePatch, RolePermission, RolePermissionPatch, UserRole, UserRolePatch,
};
use crate::domain::users::{NewUser, User, UserPatch};
use crate::error::{CoreError, Result};

trait Record: Clone {
    const ENTITY: &'static str;

    fn deleted_at(&self) -> Option<DateTime<Utc>>;
    fn set_deleted_at(&mut self, at: DateTime<Utc>);
    fn touch(&mut self, at: DateTime<Utc>);

    fn is_active(&self) -> bool {
        self.deleted_at().is_none()
    }
}

macro_rules! impl_record {
    ($($ty:ty => $entity:literal),* $(,)?) => {$(
        impl Record for $ty {
            const ENTITY: &'static str = $entity;

            fn deleted_at(&self) -> Option<DateTime<Utc>> {
                self.deleted_at
            }

            fn set_deleted_at(&mut self, at: DateTime<Utc>) {
                self.deleted_at = Some(at);
                self.updated_at = at;
            }

            fn touch(&mut self, at: DateTime<Utc>) {
                self.updated_at = at;
            }
        }
    )*};
}

impl_record! {
    User => "user",
    Role => "role",
    Permission => "permission",
    RolePermission => "role permission",
    UserRole => "user role",
}

#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Record> Table<T> {
    fn insert(&mut self, build: impl FnOnce(i64, DateTime<Utc>) -> T) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(id, build(id, Utc::now()));
        id
    }

    fn active(&self) -> impl Iterator<Item = &T> {
        self.rows.values().filter(|row| row.is_active())
    }

    fn get(&self, id: i64) -> Result<T> {
        self.rows
            .get(&id)
            .filter(|row| row.is_active())
            .cloned()
            .ok_or_else(|| CoreError::NotFound(T::ENTITY.to_string()))
    }

    fn find(&self, predicate: impl Fn(&T) -> bool) -> Result<T> {
        self.active()
            .find(|row| predicate(row))
            .cloned()
            .ok_or_else(|| CoreError::NotFound(T::ENTITY.to_string()))
    }

    fn is_active(&self, id: i64) -> bool {
        self.rows.get(&id).is_some_and(|row| row.is_active())
    }

    fn active_mut(&mut self, id: i64) -> Result<&mut T> {
        self.rows
            .get_mut(&id)
            .filter(|row| row.is_active())
            .ok_or_else(|| CoreError::NoRowsAffected(T::ENTITY.to_string()))
    }

    /// Fails with `UniqueViolation` when another active row collides.
    fn ensure_unique(
        &self,
        except: Option<i64>,
        collides: impl Fn(&T) -> bool,
    ) -> Result<()> {
        let clash = self
            .rows
            .iter()
            .any(|(id, row)| Some(*id) != except && row.is_active() && collides(row));
        if clash {
            return Err(CoreError::UniqueViolation(T::ENTITY.to_string()));
        }
        Ok(())
    }

    fn update(&mut self, id: i64, apply: impl FnOnce(&mut T)) -> Result<String> {
        let row = self.active_mut(id)?;
        apply(&mut *row);
        row.touch(Utc::now());
        Ok(message("Updated", T::ENTITY))
    }

    fn soft_delete(&mut self, id: i64) -> Result<String> {
        self.active_mut(id)?.set_deleted_at(Utc::now());
        Ok(message("Soft-deleted", T::ENTITY))
    }

    fn hard_delete(&mut self, id: i64) -> Result<String> {
        self.rows
            .remove(&id)
            .map(|_| message("Deleted", T::ENTITY))
            .ok_or_else(|| CoreError::NoRowsAffected(T::ENTITY.to_string()))
    }
}

fn message(verb: &str, entity: &str) -> String {
    format!("{verb} {entity} (rows affected: 1)")
}

#[derive(Debug, Default)]
struct State {
    users: Table<User>,
    roles: Table<Role>,
    permissions: Table<Permission>,
    role_permissions: Table<RolePermission>,
    user_roles: Table<UserRole>,
}

impl State {
    fn insert_user(&mut self, user: &NewUser) -> Result<i64> {
        self.users.ensure_unique(None, |u| u.email == user.email)?;
        Ok(self.users.insert(|id, now| User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    fn insert_user_role(&mut self, user_id: i64, role_id: i64) -> Result<i64> {
        if !self.users.is_active(user_id) || !self.roles.is_active(role_id) {
            return Err(CoreError::ForeignKeyViolation(
                UserRole::ENTITY.to_string(),
            ));
        }
        self.user_roles
            .ensure_unique(None, |ur| ur.user_id == user_id && ur.role_id == role_id)?;
        Ok(self.user_roles.insert(|id, now| UserRole {
            id,
            user_id,
            role_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    /// Ids of active roles held by an active user.
    fn active_role_ids(&self, user_id: i64) -> HashSet<i64> {
        if !self.users.is_active(user_id) {
            return HashSet::new();
        }
        self.user_roles
            .active()
            .filter(|ur| ur.user_id == user_id && self.roles.is_active(ur.role_id))
            .map(|ur| ur.role_id)
            .collect()
    }

    fn user_permissions(&self, user_id: i64) -> Vec<Permission> {
        let role_ids = self.active_role_ids(user_id);
        let permission_ids: HashSet<i64> = self
            .role_permissions
            .active()
            .filter(|rp| role_ids.contains(&rp.role_id))
            .map(|rp| rp.permission_id)
            .collect();

        self.permissions
            .active()
            .filter(|p| permission_ids.contains(&p.id))
            .cloned()
            .collect()
    }

    fn has_role(&self, user_id: i64, role_name: &str) -> bool {
        self.active_role_ids(user_id).into_iter().any(|role_id| {
            self.roles
                .get(role_id)
                .is_ok_and(|role| role.name == role_name)
        })
    }
}

/// Shared in-memory store implementing all five repository ports.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsersRepository for InMemoryStore {
    async fn create(&self, user: &NewUser) -> Result<i64> {
        let id = self.state.lock().insert_user(user)?;
        info!(user_id = id, "created user");
        Ok(id)
    }

    async fn create_with_role(
        &self,
        user: &NewUser,
        role_name: &str,
    ) -> Result<i64> {
        let mut state = self.state.lock();
        let role_id = state
            .roles
            .find(|role| role.name == role_name)
            .map_err(|_| CoreError::NotFound(format!("role '{role_name}'")))?
            .id;

        let user_id = state.insert_user(user)?;
        state.insert_user_role(user_id, role_id)?;
        Ok(user_id)
    }

    async fn get_by_id(&self, id: i64) -> Result<User> {
        self.state.lock().users.get(id)
    }

    async fn get_by_email(&self, email: &str) -> Result<User> {
        self.state.lock().users.find(|user| user.email == email)
    }

    async fn get_all(&self) -> Result<Vec<User>> {
        Ok(self.state.lock().users.active().cloned().collect())
    }

    async fn update(&self, id: i64, patch: &UserPatch) -> Result<String> {
        let mut state = self.state.lock();
        state.users.active_mut(id)?;
        if let Some(email) = &patch.email {
            state.users.ensure_unique(Some(id), |u| &u.email == email)?;
        }
        state.users.update(id, |user| {
            if let Some(name) = &patch.name {
                user.name = name.clone();
            }
            if let Some(email) = &patch.email {
                user.email = email.clone();
            }
        })
    }

    async fn soft_delete(&self, id: i64) -> Result<String> {
        self.state.lock().users.soft_delete(id)
    }

    async fn hard_delete(&self, id: i64) -> Result<String> {
        let mut state = self.state.lock();
        if state.user_roles.rows.values().any(|ur| ur.user_id == id) {
            return Err(CoreError::ForeignKeyViolation(User::ENTITY.to_string()));
        }
        state.users.hard_delete(id)
    }
}

#[async_trait]
impl RolesRepository for InMemoryStore {
    async fn create(&self, role: &NewRole) -> Result<i64> {
        let mut state = self.state.lock();
        state.roles.ensure_unique(None, |r| r.name == role.name)?;
        Ok(state.roles.insert(|id, now| Role {
            id,
            name: role.name.clone(),
            description: role.description.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn get_by_id(&self, id: i64) -> Result<Role> {
        self.state.lock().roles.get(id)
    }

    async fn get_by_name(&self, name: &str) -> Result<Role> {
        self.state.lock().roles.find(|role| role.name == name)
    }

    async fn get_all(&self) -> Result<Vec<Role>> {
        Ok(self.state.lock().roles.active().cloned().collect())
    }

    async fn update(&self, id: i64, patch: &RolePatch) -> Result<String> {
        let mut state = self.state.lock();
        state.roles.active_mut(id)?;
        if let Some(name) = &patch.name {
            state.roles.ensure_unique(Some(id), |r| &r.name == name)?;
        }
        state.roles.update(id, |role| {
            if let Some(name) = &patch.name {
                role.name = name.clone();
            }
            if let Some(description) = &patch.description {
                role.description = description.clone();
            }
        })
    }

    async fn soft_delete(&self, id: i64) -> Result<String> {
        self.state.lock().roles.soft_delete(id)
    }

    async fn hard_delete(&self, id: i64) -> Result<String> {
        let mut state = self.state.lock();
        let referenced = state.user_roles.rows.values().any(|ur| ur.role_id == id)
            || state.role_permissions.rows.values().any(|rp| rp.role_id == id);
        if referenced {
            return Err(CoreError::ForeignKeyViolation(Role::ENTITY.to_string()));
        }
        state.roles.hard_delete(id)
    }
}

#[async_trait]
impl PermissionsRepository for InMemoryStore {
    async fn create(&self, permission: &NewPermission) -> Result<i64> {
        let mut state = self.state.lock();
        state.permissions.ensure_unique(None, |p| {
            p.name == permission.name
                || (p.resource == permission.resource
                    && p.action == permission.action)
        })?;
        Ok(state.permissions.insert(|id, now| Permission {
            id,
            name: permission.name.clone(),
            description: permission.description.clone(),
            resource: permission.resource.clone(),
            action: permission.action.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn get_by_id(&self, id: i64) -> Result<Permission> {
        self.state.lock().permissions.get(id)
    }

    async fn get_by_name(&self, name: &str) -> Result<Permission> {
        self.state.lock().permissions.find(|p| p.name == name)
    }

    async fn get_by_capability(
        &self,
        capability: &Capability,
    ) -> Result<Permission> {
        self.state.lock().permissions.find(|p| {
            p.resource == capability.resource && p.action == capability.action
        })
    }

    async fn get_all(&self) -> Result<Vec<Permission>> {
        Ok(self.state.lock().permissions.active().cloned().collect())
    }

    async fn update(
        &self,
        id: i64,
        patch: &PermissionPatch,
    ) -> Result<String> {
        let mut state = self.state.lock();
        let current = state.permissions.active_mut(id)?.clone();
        let name = patch.name.clone().unwrap_or(current.name);
        let resource = patch.resource.clone().unwrap_or(current.resource);
        let action = patch.action.clone().unwrap_or(current.action);

        state.permissions.ensure_unique(Some(id), |p| {
            p.name == name || (p.resource == resource && p.action == action)
        })?;
        state.permissions.update(id, |permission| {
            permission.name = name;
            permission.resource = resource;
            permission.action = action;
            if let Some(description) = &patch.description {
                permission.description = description.clone();
            }
        })
    }

    async fn soft_delete(&self, id: i64) -> Result<String> {
        self.state.lock().permissions.soft_delete(id)
    }

    async fn hard_delete(&self, id: i64) -> Result<String> {
        let mut state = self.state.lock();
        if state
            .role_permissions
            .rows
            .values()
            .any(|rp| rp.permission_id == id)
        {
            return Err(CoreError::ForeignKeyViolation(
                Permission::ENTITY.to_string(),
            ));
        }
        state.permissions.hard_delete(id)
    }
}

#[async_trait]
impl RolePermissionsRepository for InMemoryStore {
    async fn create(&self, role_id: i64, permission_id: i64) -> Result<i64> {
        let mut state = self.state.lock();
        if !state.roles.is_active(role_id)
            || !state.permissions.is_active(permission_id)
        {
            return Err(CoreError::ForeignKeyViolation(
                RolePermission::ENTITY.to_string(),
            ));
        }
        state.role_permissions.ensure_unique(None, |rp| {
            rp.role_id == role_id && rp.permission_id == permission_id
        })?;
        let id = state.role_permissions.insert(|id, now| RolePermission {
            id,
            role_id,
            permission_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        });
        info!(role_id, permission_id, "granted permission to role");
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> Result<RolePermission> {
        self.state.lock().role_permissions.get(id)
    }

    async fn get_all(&self) -> Result<Vec<RolePermission>> {
        Ok(self.state.lock().role_permissions.active().cloned().collect())
    }

    async fn update(
        &self,
        id: i64,
        patch: &RolePermissionPatch,
    ) -> Result<String> {
        let mut state = self.state.lock();
        let role_ok = patch.role_id.is_none_or(|r| state.roles.is_active(r));
        let permission_ok = patch
            .permission_id
            .is_none_or(|p| state.permissions.is_active(p));
        if !role_ok || !permission_ok {
            return Err(CoreError::ForeignKeyViolation(
                RolePermission::ENTITY.to_string(),
            ));
        }

        let current = state.role_permissions.active_mut(id)?.clone();
        let role_id = patch.role_id.unwrap_or(current.role_id);
        let permission_id = patch.permission_id.unwrap_or(current.permission_id);
        state.role_permissions.ensure_unique(Some(id), |rp| {
            rp.role_id == role_id && rp.permission_id == permission_id
        })?;
        state.role_permissions.update(id, |rp| {
            rp.role_id = role_id;
            rp.permission_id = permission_id;
        })
    }

    async fn soft_delete(&self, id: i64) -> Result<String> {
        self.state.lock().role_permissions.soft_delete(id)
    }

    async fn hard_delete(&self, id: i64) -> Result<String> {
        self.state.lock().role_permissions.hard_delete(id)
    }

    async fn remove_permission_from_role(
        &self,
        role_id: i64,
        permission_id: i64,
    ) -> Result<String> {
        let mut state = self.state.lock();
        let link = state
            .role_permissions
            .find(|rp| rp.role_id == role_id && rp.permission_id == permission_id)
            .map_err(|_| {
                CoreError::NoRowsAffected(RolePermission::ENTITY.to_string())
            })?;
        state.role_permissions.soft_delete(link.id)
    }

    async fn get_role_permissions(
        &self,
        role_id: i64,
    ) -> Result<Vec<Permission>> {
        let state = self.state.lock();
        if !state.roles.is_active(role_id) {
            return Ok(Vec::new());
        }
        let permission_ids: HashSet<i64> = state
            .role_permissions
            .active()
            .filter(|rp| rp.role_id == role_id)
            .map(|rp| rp.permission_id)
            .collect();
        Ok(state
            .permissions
            .active()
            .filter(|p| permission_ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserRolesRepository for InMemoryStore {
    async fn create(&self, user_id: i64, role_id: i64) -> Result<i64> {
        let id = self.state.lock().insert_user_role(user_id, role_id)?;
        info!(user_id, role_id, "assigned role to user");
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> Result<UserRole> {
        self.state.lock().user_roles.get(id)
    }

    async fn get_all(&self) -> Result<Vec<UserRole>> {
        Ok(self.state.lock().user_roles.active().cloned().collect())
    }

    async fn update(&self, id: i64, patch: &UserRolePatch) -> Result<String> {
        let mut state = self.state.lock();
        let user_ok = patch.user_id.is_none_or(|u| state.users.is_active(u));
        let role_ok = patch.role_id.is_none_or(|r| state.roles.is_active(r));
        if !user_ok || !role_ok {
            return Err(CoreError::ForeignKeyViolation(
                UserRole::ENTITY.to_string(),
            ));
        }

        let current = state.user_roles.active_mut(id)?.clone();
        let user_id = patch.user_id.unwrap_or(current.user_id);
        let role_id = patch.role_id.unwrap_or(current.role_id);
        state.user_roles.ensure_unique(Some(id), |ur| {
            ur.user_id == user_id && ur.role_id == role_id
        })?;
        state.user_roles.update(id, |ur| {
            ur.user_id = user_id;
            ur.role_id = role_id;
        })
    }

    async fn soft_delete(&self, id: i64) -> Result<String> {
        self.state.lock().user_roles.soft_delete(id)
    }

    async fn hard_delete(&self, id: i64) -> Result<String> {
        self.state.lock().user_roles.hard_delete(id)
    }

    async fn remove_role_from_user(
        &self,
        user_id: i64,
        role_id: i64,
    ) -> Result<String> {
        let mut state = self.state.lock();
        let link = state
            .user_roles
            .find(|ur| ur.user_id == user_id && ur.role_id == role_id)
            .map_err(|_| CoreError::NoRowsAffected(UserRole::ENTITY.to_string()))?;
        state.user_roles.soft_delete(link.id)
    }

    async fn get_user_roles(&self, user_id: i64) -> Result<Vec<Role>> {
        let state = self.state.lock();
        let role_ids = state.active_role_ids(user_id);
        Ok(state
            .roles
            .active()
            .filter(|role| role_ids.contains(&role.id))
            .cloned()
            .collect())
    }

    async fn get_user_permissions(
        &self,
        user_id: i64,
    ) -> Result<Vec<Permission>> {
        Ok(self.state.lock().user_permissions(user_id))
    }

    async fn has_role(&self, user_id: i64, role_name: &str) -> Result<bool> {
        Ok(self.state.lock().has_role(user_id, role_name))
    }

    async fn has_permission(
        &self,
        user_id: i64,
        capability: &Capability,
    ) -> Result<bool> {
        Ok(self.state.lock().user_permissions(user_id).iter().any(|p| {
            p.resource == capability.resource && p.action == capability.action
        }))
    }

    async fn has_permission_named(
        &self,
        user_id: i64,
        permission_name: &str,
    ) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .user_permissions(user_id)
            .iter()
            .any(|p| p.name == permission_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test".into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
        }
    }

    fn new_role(name: &str) -> NewRole {
        NewRole {
            name: name.into(),
            description: String::new(),
        }
    }

    fn new_permission(resource: &str, action: &str) -> NewPermission {
        NewPermission {
            name: format!("{resource}:{action}"),
            description: String::new(),
            resource: resource.into(),
            action: action.into(),
        }
    }

    #[tokio::test]
    async fn soft_deleted_email_can_be_reused() {
        let store = InMemoryStore::new();
        let first = UsersRepository::create(&store, &new_user("a@x.io"))
            .await
            .unwrap();

        assert!(matches!(
            UsersRepository::create(&store, &new_user("a@x.io")).await,
            Err(CoreError::UniqueViolation(_))
        ));

        UsersRepository::soft_delete(&store, first).await.unwrap();
        let second = UsersRepository::create(&store, &new_user("a@x.io"))
            .await
            .unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn hard_delete_is_restricted_by_associations() {
        let store = InMemoryStore::new();
        let user = UsersRepository::create(&store, &new_user("a@x.io"))
            .await
            .unwrap();
        let role = RolesRepository::create(&store, &new_role("editor"))
            .await
            .unwrap();
        store.assign_role_to_user(user, role).await.unwrap();
        store.remove_role_from_user(user, role).await.unwrap();

        // The revoked row still references both endpoints.
        assert!(matches!(
            RolesRepository::hard_delete(&store, role).await,
            Err(CoreError::ForeignKeyViolation(_))
        ));
        assert!(matches!(
            UsersRepository::hard_delete(&store, user).await,
            Err(CoreError::ForeignKeyViolation(_))
        ));
    }

    #[tokio::test]
    async fn create_with_role_leaves_nothing_behind_on_missing_role() {
        let store = InMemoryStore::new();
        let err = store
            .create_with_role(&new_user("a@x.io"), "member")
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::NotFound(_)));
        assert!(UsersRepository::get_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn association_endpoints_must_be_active() {
        let store = InMemoryStore::new();
        let role = RolesRepository::create(&store, &new_role("editor"))
            .await
            .unwrap();
        RolesRepository::soft_delete(&store, role).await.unwrap();

        let permission = PermissionsRepository::create(
            &store,
            &NewPermission {
                name: "articles:write".into(),
                description: String::new(),
                resource: "articles".into(),
                action: "write".into(),
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            store.add_permission_to_role(role, permission).await,
            Err(CoreError::ForeignKeyViolation(_))
        ));
    }

    #[tokio::test]
    async fn catalog_lookups_skip_soft_deleted_rows() {
        let store = InMemoryStore::new();
        let role = RolesRepository::create(&store, &new_role("editor"))
            .await
            .unwrap();
        let permission =
            PermissionsRepository::create(&store, &new_permission("articles", "write"))
                .await
                .unwrap();
        let capability = Capability::new("articles", "write");

        assert_eq!(RolesRepository::get_by_name(&store, "editor").await.unwrap().id, role);
        assert_eq!(
            PermissionsRepository::get_by_name(&store, "articles:write")
                .await
                .unwrap()
                .id,
            permission
        );
        assert_eq!(
            store.get_by_capability(&capability).await.unwrap().id,
            permission
        );

        RolesRepository::soft_delete(&store, role).await.unwrap();
        PermissionsRepository::soft_delete(&store, permission).await.unwrap();

        assert!(matches!(
            RolesRepository::get_by_name(&store, "editor").await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            PermissionsRepository::get_by_name(&store, "articles:write").await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            store.get_by_capability(&capability).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn role_permission_links_can_be_read_patched_and_deleted() {
        let store = InMemoryStore::new();
        let editor = RolesRepository::create(&store, &new_role("editor"))
            .await
            .unwrap();
        let writer = RolesRepository::create(&store, &new_role("writer"))
            .await
            .unwrap();
        let read = PermissionsRepository::create(&store, &new_permission("articles", "read"))
            .await
            .unwrap();
        let write =
            PermissionsRepository::create(&store, &new_permission("articles", "write"))
                .await
                .unwrap();

        let link = store.add_permission_to_role(editor, read).await.unwrap();
        store.add_permission_to_role(editor, write).await.unwrap();

        let row = RolePermissionsRepository::get_by_id(&store, link).await.unwrap();
        assert_eq!((row.role_id, row.permission_id), (editor, read));
        assert_eq!(RolePermissionsRepository::get_all(&store).await.unwrap().len(), 2);

        let message = RolePermissionsRepository::update(
            &store,
            link,
            &RolePermissionPatch {
                role_id: Some(writer),
                permission_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(message, "Updated role permission (rows affected: 1)");
        let row = RolePermissionsRepository::get_by_id(&store, link).await.unwrap();
        assert_eq!((row.role_id, row.permission_id), (writer, read));
        assert_eq!(store.get_role_permissions(writer).await.unwrap().len(), 1);

        // Moving onto an existing active pair.
        let duplicate = RolePermissionPatch {
            role_id: Some(editor),
            permission_id: Some(write),
        };
        assert!(matches!(
            RolePermissionsRepository::update(&store, link, &duplicate).await,
            Err(CoreError::UniqueViolation(_))
        ));

        let retired = RolesRepository::create(&store, &new_role("retired"))
            .await
            .unwrap();
        RolesRepository::soft_delete(&store, retired).await.unwrap();
        for patch in [
            RolePermissionPatch {
                role_id: Some(retired),
                permission_id: None,
            },
            RolePermissionPatch {
                role_id: None,
                permission_id: Some(9_999),
            },
        ] {
            assert!(matches!(
                RolePermissionsRepository::update(&store, link, &patch).await,
                Err(CoreError::ForeignKeyViolation(_))
            ));
        }

        RolePermissionsRepository::soft_delete(&store, link).await.unwrap();
        assert!(matches!(
            RolePermissionsRepository::get_by_id(&store, link).await,
            Err(CoreError::NotFound(_))
        ));
        assert_eq!(RolePermissionsRepository::get_all(&store).await.unwrap().len(), 1);
        assert!(matches!(
            RolePermissionsRepository::update(
                &store,
                link,
                &RolePermissionPatch {
                    role_id: Some(editor),
                    permission_id: None,
                },
            )
            .await,
            Err(CoreError::NoRowsAffected(_))
        ));
        assert!(matches!(
            RolePermissionsRepository::soft_delete(&store, link).await,
            Err(CoreError::NoRowsAffected(_))
        ));

        // The revoked pair may be granted again.
        store.add_permission_to_role(writer, read).await.unwrap();

        RolePermissionsRepository::hard_delete(&store, link).await.unwrap();
        assert!(matches!(
            RolePermissionsRepository::hard_delete(&store, link).await,
            Err(CoreError::NoRowsAffected(_))
        ));
    }

    #[tokio::test]
    async fn user_role_links_can_be_read_patched_and_deleted() {
        let store = InMemoryStore::new();
        let alice = UsersRepository::create(&store, &new_user("alice@x.io"))
            .await
            .unwrap();
        let bob = UsersRepository::create(&store, &new_user("bob@x.io"))
            .await
            .unwrap();
        let editor = RolesRepository::create(&store, &new_role("editor"))
            .await
            .unwrap();
        let auditor = RolesRepository::create(&store, &new_role("auditor"))
            .await
            .unwrap();

        let link = store.assign_role_to_user(alice, editor).await.unwrap();
        store.assign_role_to_user(bob, editor).await.unwrap();

        let row = UserRolesRepository::get_by_id(&store, link).await.unwrap();
        assert_eq!((row.user_id, row.role_id), (alice, editor));
        assert_eq!(UserRolesRepository::get_all(&store).await.unwrap().len(), 2);

        assert!(matches!(
            UserRolesRepository::update(
                &store,
                link,
                &UserRolePatch {
                    user_id: Some(bob),
                    role_id: None,
                },
            )
            .await,
            Err(CoreError::UniqueViolation(_))
        ));

        UserRolesRepository::update(
            &store,
            link,
            &UserRolePatch {
                user_id: None,
                role_id: Some(auditor),
            },
        )
        .await
        .unwrap();
        assert!(store.has_role(alice, "auditor").await.unwrap());
        assert!(!store.has_role(alice, "editor").await.unwrap());

        let gone = UsersRepository::create(&store, &new_user("gone@x.io"))
            .await
            .unwrap();
        UsersRepository::soft_delete(&store, gone).await.unwrap();
        assert!(matches!(
            UserRolesRepository::update(
                &store,
                link,
                &UserRolePatch {
                    user_id: Some(gone),
                    role_id: None,
                },
            )
            .await,
            Err(CoreError::ForeignKeyViolation(_))
        ));

        UserRolesRepository::soft_delete(&store, link).await.unwrap();
        assert!(matches!(
            UserRolesRepository::get_by_id(&store, link).await,
            Err(CoreError::NotFound(_))
        ));
        assert_eq!(UserRolesRepository::get_all(&store).await.unwrap().len(), 1);
        assert!(matches!(
            UserRolesRepository::update(
                &store,
                link,
                &UserRolePatch {
                    user_id: None,
                    role_id: Some(editor),
                },
            )
            .await,
            Err(CoreError::NoRowsAffected(_))
        ));

        // Once the revoked row is gone nothing references the role.
        UserRolesRepository::hard_delete(&store, link).await.unwrap();
        RolesRepository::hard_delete(&store, auditor).await.unwrap();
        assert!(matches!(
            UserRolesRepository::hard_delete(&store, link).await,
            Err(CoreError::NoRowsAffected(_))
        ));
    }

    #[tokio::test]
    async fn permission_hard_delete_waits_for_its_links() {
        let store = InMemoryStore::new();
        let role = RolesRepository::create(&store, &new_role("editor"))
            .await
            .unwrap();
        let permission =
            PermissionsRepository::create(&store, &new_permission("articles", "write"))
                .await
                .unwrap();
        let link = store.add_permission_to_role(role, permission).await.unwrap();

        assert!(matches!(
            PermissionsRepository::hard_delete(&store, permission).await,
            Err(CoreError::ForeignKeyViolation(_))
        ));

        RolePermissionsRepository::hard_delete(&store, link).await.unwrap();
        PermissionsRepository::hard_delete(&store, permission).await.unwrap();
        assert!(matches!(
            PermissionsRepository::get_by_id(&store, permission).await,
            Err(CoreError::NotFound(_))
        ));
    }
}
