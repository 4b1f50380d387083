use anyhow::Result;
use axum::http::StatusCode;
use gatehouse_core::auth::TokenIssuer;
use serde_json::{Value, json};

#[path = "support/mod.rs"]
mod support;

use support::{PASSWORD, bearer, build_test_app, login, register_user, signed_in_user};

#[tokio::test]
async fn register_login_and_fetch_current_user() -> Result<()> {
    let app = build_test_app().await?;
    let server = &app.server;

    let user_id = register_user(server, "Alice", "Alice@Example.com").await;
    let token = login(server, "alice@example.com").await;

    let claims = app.state.auth.verify_token(&token)?;
    assert_eq!(claims.email, "alice@example.com");

    let me = server
        .get("/api/v1/users/me")
        .add_header("Authorization", bearer(&token))
        .await;
    me.assert_status_ok();
    let body: Value = me.json();
    assert_eq!(body["data"]["id"], user_id);
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert!(body["data"].get("password_hash").is_none());

    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() -> Result<()> {
    let app = build_test_app().await?;
    register_user(&app.server, "Alice", "alice@example.com").await;

    let again = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({
            "name": "Other Alice",
            "email": "alice@example.com",
            "password": PASSWORD,
        }))
        .await;
    again.assert_status(StatusCode::CONFLICT);

    let users = app.state.users.list().await?;
    assert_eq!(users.len(), 1);
    Ok(())
}

#[tokio::test]
async fn malformed_registration_is_a_bad_request() -> Result<()> {
    let app = build_test_app().await?;

    for payload in [
        json!({ "name": "Bob", "email": "not-an-email", "password": PASSWORD }),
        json!({ "name": "Bob", "email": "bob@example.com", "password": "short" }),
        json!({ "name": "  ", "email": "bob@example.com", "password": PASSWORD }),
    ] {
        app.server
            .post("/api/v1/auth/register")
            .json(&payload)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    assert!(app.state.users.list().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_logins_do_not_reveal_which_part_was_wrong() -> Result<()> {
    let app = build_test_app().await?;
    register_user(&app.server, "Alice", "alice@example.com").await;

    let wrong_password = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "alice@example.com", "password": "Wrong#12345" }))
        .await;
    let unknown_email = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
        .await;

    wrong_password.assert_status(StatusCode::UNAUTHORIZED);
    unknown_email.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.json::<Value>(), unknown_email.json::<Value>());
    Ok(())
}

#[tokio::test]
async fn protected_routes_need_a_valid_bearer_token() -> Result<()> {
    let app = build_test_app().await?;
    let server = &app.server;

    server
        .get("/api/v1/users/me")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .get("/api/v1/users/me")
        .add_header("Authorization", "Token abc")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let garbage = server
        .get("/api/v1/users/me")
        .add_header("Authorization", bearer("not.a.jwt"))
        .await;
    garbage.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = garbage.json();
    assert_eq!(body["error"]["message"], "invalid token");

    Ok(())
}

#[tokio::test]
async fn token_signed_with_another_secret_reads_like_garbage() -> Result<()> {
    let app = build_test_app().await?;
    let user_id = register_user(&app.server, "Alice", "alice@example.com").await;

    let forged =
        TokenIssuer::new("some-other-secret", None)?.issue_for(user_id, "alice@example.com")?;
    let response = app
        .server
        .get("/api/v1/users/me")
        .add_header("Authorization", bearer(&forged))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["message"], "invalid token");
    Ok(())
}

#[tokio::test]
async fn soft_deleted_account_loses_its_session() -> Result<()> {
    let app = build_test_app().await?;
    let (user_id, token) = signed_in_user(&app.server, "Alice", "alice@example.com").await;

    app.server
        .delete(&format!("/api/v1/users/{user_id}"))
        .add_header("Authorization", bearer(&token))
        .await
        .assert_status_ok();

    app.server
        .get("/api/v1/users/me")
        .add_header("Authorization", bearer(&token))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "alice@example.com", "password": PASSWORD }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn reregistered_email_does_not_accept_the_old_token() -> Result<()> {
    let app = build_test_app().await?;
    let (old_id, old_token) = signed_in_user(&app.server, "Old Owner", "x@example.com").await;

    app.server
        .delete(&format!("/api/v1/users/{old_id}"))
        .add_header("Authorization", bearer(&old_token))
        .await
        .assert_status_ok();

    let new_id = register_user(&app.server, "New Owner", "x@example.com").await;
    assert_ne!(new_id, old_id);

    app.server
        .get("/api/v1/users/me")
        .add_header("Authorization", bearer(&old_token))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let new_token = login(&app.server, "x@example.com").await;
    let me: Value = app
        .server
        .get("/api/v1/users/me")
        .add_header("Authorization", bearer(&new_token))
        .await
        .json();
    assert_eq!(me["data"]["id"], new_id);
    Ok(())
}

#[tokio::test]
async fn freed_email_does_not_carry_tokens_to_its_next_owner() -> Result<()> {
    let app = build_test_app().await?;
    let (bob_id, bob_token) = signed_in_user(&app.server, "Bob", "x@example.com").await;

    app.server
        .patch(&format!("/api/v1/users/{bob_id}"))
        .add_header("Authorization", bearer(&bob_token))
        .json(&json!({ "email": "bob@example.com" }))
        .await
        .assert_status_ok();
    register_user(&app.server, "Alice", "x@example.com").await;

    app.server
        .get("/api/v1/users/me")
        .add_header("Authorization", bearer(&bob_token))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn health_endpoints_are_public() -> Result<()> {
    let app = build_test_app().await?;
    app.server.get("/ping").await.assert_text("pong");
    app.server.get("/health").await.assert_status_ok();
    Ok(())
}
