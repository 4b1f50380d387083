use axum::{extract::FromRequestParts, http::request::Parts};

use gatehouse_core::domain::users::User;

use crate::infra::{app_state::AppState, errors::AppError};

/// Verified identity claims placed on the request by `auth_middleware`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

/// The active user behind the verified identity.
///
/// Reuses the user loaded by the permission guard when there is one. A token
/// whose user has since been deleted is treated as unauthenticated.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(Self(user.clone()));
        }

        let identity = Identity::from_request_parts(parts, state).await?;
        let user = resolve_user(state, &identity).await?;
        parts.extensions.insert(user.clone());
        Ok(Self(user))
    }
}

pub(crate) async fn resolve_user(
    state: &AppState,
    identity: &Identity,
) -> Result<User, AppError> {
    state
        .auth
        .identify(identity.user_id, &identity.email)
        .await
        .map_err(|err| {
            if err.is_missing() {
                AppError::unauthorized("Account no longer active")
            } else {
                AppError::from(err)
            }
        })
}
