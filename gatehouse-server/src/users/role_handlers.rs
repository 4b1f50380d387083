//! Role management endpoints
//!
//! Every route here sits behind `require_permission(rbac:manage)`.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use gatehouse_core::domain::rbac::{NewRole, Permission, Role, RolePatch};

use crate::api_types::{ApiResponse, CreatedResponse};
use crate::infra::{app_state::AppState, errors::AppResult};

/// Role with the permissions it currently grants
#[derive(Debug, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

pub async fn list_roles_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Role>>>> {
    let roles = state.access.list_roles().await?;
    Ok(Json(ApiResponse::success(roles)))
}

pub async fn get_role_handler(
    State(state): State<AppState>,
    Path(role_id): Path<i64>,
) -> AppResult<Json<ApiResponse<RoleWithPermissions>>> {
    let role = state.access.get_role(role_id).await?;
    let permissions = state.access.get_role_permissions(role_id).await?;
    Ok(Json(ApiResponse::success(RoleWithPermissions {
        role,
        permissions,
    })))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Json(request): Json<NewRole>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedResponse>>)> {
    let id = state.access.create_role(&request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedResponse { id })),
    ))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Path(role_id): Path<i64>,
    Json(patch): Json<RolePatch>,
) -> AppResult<Json<ApiResponse<()>>> {
    let message = state.access.update_role(role_id, &patch).await?;
    Ok(Json(ApiResponse::message(message)))
}

/// Soft delete. Existing assignments stay in place but stop granting
/// anything because the role is no longer active.
pub async fn delete_role_handler(
    State(state): State<AppState>,
    Path(role_id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let message = state.access.soft_delete_role(role_id).await?;
    Ok(Json(ApiResponse::message(message)))
}

pub async fn get_role_permissions_handler(
    State(state): State<AppState>,
    Path(role_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<Permission>>>> {
    // 404 for a missing role rather than an empty list
    state.access.get_role(role_id).await?;
    let permissions = state.access.get_role_permissions(role_id).await?;
    Ok(Json(ApiResponse::success(permissions)))
}

pub async fn grant_permission_handler(
    State(state): State<AppState>,
    Path((role_id, permission_id)): Path<(i64, i64)>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedResponse>>)> {
    let id = state
        .access
        .add_permission_to_role(role_id, permission_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedResponse { id })),
    ))
}

pub async fn revoke_permission_handler(
    State(state): State<AppState>,
    Path((role_id, permission_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<()>>> {
    let message = state
        .access
        .remove_permission_from_role(role_id, permission_id)
        .await?;
    Ok(Json(ApiResponse::message(message)))
}
