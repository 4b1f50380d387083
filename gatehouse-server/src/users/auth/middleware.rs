use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::identity::Identity;
use crate::infra::{app_state::AppState, errors::AppError};

const BEARER_PREFIX: &str = "Bearer ";

/// Session middleware: verify the bearer token and attach its identity.
///
/// A missing, malformed or unverifiable token ends the request with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&request)?;
    let claims = state.auth.verify_token(token)?;

    request.extensions_mut().insert(Identity {
        user_id: claims.sub,
        email: claims.email,
    });
    Ok(next.run(request).await)
}

fn extract_bearer_token(request: &Request) -> Result<&str, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            debug!("request without authorization header");
            AppError::unauthorized("Missing bearer token")
        })?;

    auth_header
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("Missing bearer token"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(header_value: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn bearer_token_is_extracted() {
        let request = request_with(Some("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&request).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn other_schemes_are_rejected() {
        for value in [None, Some("Basic dXNlcjpwYXNz"), Some("bearer abc"), Some("Bearer ")] {
            let request = request_with(value);
            let err = extract_bearer_token(&request).unwrap_err();
            assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
        }
    }
}
