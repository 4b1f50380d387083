use axum::{Json, extract::State, http::StatusCode};

use crate::api_types::{
    ApiResponse, CreatedResponse, LoginRequest, RegisterRequest, TokenResponse,
};
use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedResponse>>)> {
    let user_id = state
        .auth
        .register(&request.name, &request.email, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(
            ApiResponse::success(CreatedResponse { id: user_id })
                .with_message("User registered".to_string()),
        ),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    let token = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(ApiResponse::success(TokenResponse { token })))
}
