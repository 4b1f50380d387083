use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use gatehouse_core::domain::rbac::{NewPermission, Permission, PermissionPatch};

use crate::api_types::{ApiResponse, CreatedResponse};
use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn list_permissions_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Permission>>>> {
    let permissions = state.access.list_permissions().await?;
    Ok(Json(ApiResponse::success(permissions)))
}

pub async fn get_permission_handler(
    State(state): State<AppState>,
    Path(permission_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Permission>>> {
    let permission = state.access.get_permission(permission_id).await?;
    Ok(Json(ApiResponse::success(permission)))
}

pub async fn create_permission_handler(
    State(state): State<AppState>,
    Json(request): Json<NewPermission>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedResponse>>)> {
    let id = state.access.create_permission(&request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedResponse { id })),
    ))
}

pub async fn update_permission_handler(
    State(state): State<AppState>,
    Path(permission_id): Path<i64>,
    Json(patch): Json<PermissionPatch>,
) -> AppResult<Json<ApiResponse<()>>> {
    let message = state
        .access
        .update_permission(permission_id, &patch)
        .await?;
    Ok(Json(ApiResponse::message(message)))
}

pub async fn delete_permission_handler(
    State(state): State<AppState>,
    Path(permission_id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let message = state.access.soft_delete_permission(permission_id).await?;
    Ok(Json(ApiResponse::message(message)))
}
