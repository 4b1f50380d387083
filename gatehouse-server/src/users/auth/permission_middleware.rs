use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::pin::Pin;
use tracing::warn;

use gatehouse_core::domain::rbac::Capability;

use super::identity::{Identity, resolve_user};
use crate::infra::{app_state::AppState, errors::AppError};

/// Middleware that lets the request through only when the caller holds
/// `capability`. Must run after `auth_middleware`, which sets the identity.
///
/// The resolved `User` is left in the request extensions for handlers.
pub fn require_permission(
    state: AppState,
    capability: Capability,
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Response> + Send>>
+ Clone
+ Send
+ Sync
+ 'static {
    move |request: Request, next: Next| {
        let state = state.clone();
        let capability = capability.clone();
        Box::pin(async move {
            match check_permission(&state, &capability, request).await {
                Ok(request) => next.run(request).await,
                Err(err) => err.into_response(),
            }
        })
    }
}

async fn check_permission(
    state: &AppState,
    capability: &Capability,
    mut request: Request,
) -> Result<Request, AppError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let user = resolve_user(state, &identity).await?;

    if !state.auth.authorize(user.id, capability).await? {
        warn!(user_id = user.id, %capability, "permission denied");
        return Err(AppError::forbidden(format!(
            "Permission '{capability}' required"
        )));
    }

    request.extensions_mut().insert(user);
    Ok(request)
}
