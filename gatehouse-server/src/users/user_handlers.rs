use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use gatehouse_core::domain::{
    rbac::{self, Capability, Permission, Role},
    users::{User, UserPatch},
};

use crate::api_types::{ApiResponse, CreatedResponse};
use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};
use crate::users::auth::CurrentUser;

/// Callers may act on their own account; anything else needs `rbac:manage`.
async fn ensure_self_or_manager(
    state: &AppState,
    caller: &User,
    target_id: i64,
) -> AppResult<()> {
    if caller.id == target_id {
        return Ok(());
    }

    let manage = Capability::new(
        rbac::permissions::RBAC_RESOURCE,
        rbac::permissions::MANAGE_ACTION,
    );
    if state.auth.authorize(caller.id, &manage).await? {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Permission '{manage}' required"
        )))
    }
}

pub async fn get_current_user(
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<ApiResponse<User>>> {
    Ok(Json(ApiResponse::success(user)))
}

pub async fn list_users_handler(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<User>>>> {
    let users = state.users.list().await?;
    Ok(Json(ApiResponse::success(users)))
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state.users.get(user_id).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<i64>,
    Json(patch): Json<UserPatch>,
) -> AppResult<Json<ApiResponse<()>>> {
    ensure_self_or_manager(&state, &caller, user_id).await?;
    if patch.is_empty() {
        return Err(AppError::bad_request("Nothing to update"));
    }

    let message = state.users.update(user_id, &patch).await?;
    Ok(Json(ApiResponse::message(message)))
}

pub async fn delete_user_handler(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    ensure_self_or_manager(&state, &caller, user_id).await?;
    let message = state.users.soft_delete(user_id).await?;
    Ok(Json(ApiResponse::message(message)))
}

pub async fn get_user_roles_handler(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<Role>>>> {
    ensure_self_or_manager(&state, &caller, user_id).await?;
    let roles = state.access.get_user_roles(user_id).await?;
    Ok(Json(ApiResponse::success(roles)))
}

pub async fn get_user_permissions_handler(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<Permission>>>> {
    ensure_self_or_manager(&state, &caller, user_id).await?;
    let permissions = state.access.get_user_permissions(user_id).await?;
    Ok(Json(ApiResponse::success(permissions)))
}

// Guarded by rbac:manage at the router

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Path((user_id, role_id)): Path<(i64, i64)>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedResponse>>)> {
    let id = state.access.assign_role_to_user(user_id, role_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedResponse { id })),
    ))
}

pub async fn revoke_role_handler(
    State(state): State<AppState>,
    Path((user_id, role_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<()>>> {
    let message = state.access.remove_role_from_user(user_id, role_id).await?;
    Ok(Json(ApiResponse::message(message)))
}

/// Physical delete. Refused with 409 while the user still has role
/// assignment rows.
pub async fn purge_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let message = state.users.hard_delete(user_id).await?;
    Ok(Json(ApiResponse::message(message)))
}
