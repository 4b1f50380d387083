#![allow(dead_code)]

use anyhow::{Result, anyhow};
use axum_test::TestServer;
use gatehouse_core::{
    application::AppUnitOfWork,
    auth::{CredentialHasher, TokenIssuer},
};
use gatehouse_server::{AppState, create_app};
use serde_json::{Value, json};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "Password#123";

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
}

/// Full router over the in-memory repositories, with RBAC defaults seeded
/// the way production startup seeds them.
pub async fn build_test_app() -> Result<TestApp> {
    let state = AppState::build(
        AppUnitOfWork::in_memory(),
        CredentialHasher::with_cost(8, 1, 1)?,
        TokenIssuer::new(TEST_SECRET, None)?,
        None,
    );
    state.rbac_bootstrap().ensure_defaults().await?;

    let server = TestServer::new(create_app(state.clone()))
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(TestApp { server, state })
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub async fn register_user(server: &TestServer, name: &str, email: &str) -> i64 {
    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "name": name,
            "email": email,
            "password": PASSWORD,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: Value = response.json();
    body["data"]["id"].as_i64().expect("user id returned")
}

pub async fn login(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": email, "password": PASSWORD }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    body["data"]["token"]
        .as_str()
        .expect("token returned")
        .to_string()
}

/// Register, log in and return `(user_id, token)`.
pub async fn signed_in_user(server: &TestServer, name: &str, email: &str) -> (i64, String) {
    let id = register_user(server, name, email).await;
    let token = login(server, email).await;
    (id, token)
}

/// Register a user and hand them the seeded admin role.
pub async fn signed_in_admin(app: &TestApp, email: &str) -> Result<(i64, String)> {
    let (id, token) = signed_in_user(&app.server, "Admin", email).await;
    let promoted = app.state.rbac_bootstrap().promote_admin(email).await?;
    assert!(promoted, "admin promotion should find the user");
    Ok((id, token))
}
