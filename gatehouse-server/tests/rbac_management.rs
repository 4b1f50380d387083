use anyhow::Result;
use axum::http::StatusCode;
use gatehouse_core::domain::rbac::Capability;
use gatehouse_server::infra::startup::{ProdStartupHooks, StartupHooks};
use serde_json::{Value, json};

#[path = "support/mod.rs"]
mod support;

use support::{bearer, build_test_app, signed_in_admin, signed_in_user};

fn created_id(body: &Value) -> i64 {
    body["data"]["id"].as_i64().expect("id returned")
}

#[tokio::test]
async fn management_routes_require_rbac_manage() -> Result<()> {
    let app = build_test_app().await?;
    let (user_id, token) = signed_in_user(&app.server, "Bob", "bob@example.com").await;

    let list = app
        .server
        .get("/api/v1/roles")
        .add_header("Authorization", bearer(&token))
        .await;
    list.assert_status(StatusCode::FORBIDDEN);
    let body: Value = list.json();
    assert_eq!(body["error"]["message"], "Permission 'rbac:manage' required");

    app.server
        .post("/api/v1/permissions")
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "name": "articles:write", "resource": "articles", "action": "write" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Granting yourself a role is a management operation too
    app.server
        .post(&format!("/api/v1/users/{user_id}/roles/1"))
        .add_header("Authorization", bearer(&token))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // No token at all is an authentication failure, not an authorization one
    app.server
        .get("/api/v1/roles")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn admin_grants_and_revokes_a_capability() -> Result<()> {
    let app = build_test_app().await?;
    let server = &app.server;
    let (_, admin) = signed_in_admin(&app, "admin@example.com").await?;
    let (editor_id, editor_token) =
        signed_in_user(server, "Eddie", "eddie@example.com").await;

    let role = server
        .post("/api/v1/roles")
        .add_header("Authorization", bearer(&admin))
        .json(&json!({ "name": "editor", "description": "Edits articles" }))
        .await;
    role.assert_status(StatusCode::CREATED);
    let role_id = created_id(&role.json());

    let permission = server
        .post("/api/v1/permissions")
        .add_header("Authorization", bearer(&admin))
        .json(&json!({ "name": "articles:write", "resource": "articles", "action": "write" }))
        .await;
    permission.assert_status(StatusCode::CREATED);
    let permission_id = created_id(&permission.json());

    server
        .post(&format!("/api/v1/roles/{role_id}/permissions/{permission_id}"))
        .add_header("Authorization", bearer(&admin))
        .await
        .assert_status(StatusCode::CREATED);

    // Same pair twice
    server
        .post(&format!("/api/v1/roles/{role_id}/permissions/{permission_id}"))
        .add_header("Authorization", bearer(&admin))
        .await
        .assert_status(StatusCode::CONFLICT);

    server
        .post(&format!("/api/v1/users/{editor_id}/roles/{role_id}"))
        .add_header("Authorization", bearer(&admin))
        .await
        .assert_status(StatusCode::CREATED);

    let write = Capability::new("articles", "write");
    assert!(app.state.auth.authorize(editor_id, &write).await?);

    let perms = server
        .get(&format!("/api/v1/users/{editor_id}/permissions"))
        .add_header("Authorization", bearer(&editor_token))
        .await;
    perms.assert_status_ok();
    let body: Value = perms.json();
    assert_eq!(body["data"][0]["name"], "articles:write");

    let role_detail: Value = server
        .get(&format!("/api/v1/roles/{role_id}"))
        .add_header("Authorization", bearer(&admin))
        .await
        .json();
    assert_eq!(role_detail["data"]["name"], "editor");
    assert_eq!(role_detail["data"]["permissions"][0]["id"], permission_id);

    server
        .delete(&format!("/api/v1/users/{editor_id}/roles/{role_id}"))
        .add_header("Authorization", bearer(&admin))
        .await
        .assert_status_ok();

    assert!(!app.state.auth.authorize(editor_id, &write).await?);

    // Revoking again finds no active link
    server
        .delete(&format!("/api/v1/users/{editor_id}/roles/{role_id}"))
        .add_header("Authorization", bearer(&admin))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn assignments_to_missing_records_conflict() -> Result<()> {
    let app = build_test_app().await?;
    let (admin_id, admin) = signed_in_admin(&app, "admin@example.com").await?;

    app.server
        .post(&format!("/api/v1/users/{admin_id}/roles/9999"))
        .add_header("Authorization", bearer(&admin))
        .await
        .assert_status(StatusCode::CONFLICT);

    app.server
        .get("/api/v1/roles/9999")
        .add_header("Authorization", bearer(&admin))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn users_may_only_edit_themselves_without_rbac_manage() -> Result<()> {
    let app = build_test_app().await?;
    let (alice_id, alice) = signed_in_user(&app.server, "Alice", "alice@example.com").await;
    let (bob_id, _) = signed_in_user(&app.server, "Bob", "bob@example.com").await;

    app.server
        .patch(&format!("/api/v1/users/{bob_id}"))
        .add_header("Authorization", bearer(&alice))
        .json(&json!({ "name": "Bobby" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .delete(&format!("/api/v1/users/{bob_id}"))
        .add_header("Authorization", bearer(&alice))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .patch(&format!("/api/v1/users/{alice_id}"))
        .add_header("Authorization", bearer(&alice))
        .json(&json!({ "name": "Alicia" }))
        .await
        .assert_status_ok();

    assert_eq!(app.state.users.get(alice_id).await?.name, "Alicia");
    assert_eq!(app.state.users.get(bob_id).await?.name, "Bob");
    Ok(())
}

#[tokio::test]
async fn admin_may_edit_other_users() -> Result<()> {
    let app = build_test_app().await?;
    let (_, admin) = signed_in_admin(&app, "admin@example.com").await?;
    let (bob_id, _) = signed_in_user(&app.server, "Bob", "bob@example.com").await;

    app.server
        .patch(&format!("/api/v1/users/{bob_id}"))
        .add_header("Authorization", bearer(&admin))
        .json(&json!({ "name": "Robert" }))
        .await
        .assert_status_ok();

    assert_eq!(app.state.users.get(bob_id).await?.name, "Robert");
    Ok(())
}

#[tokio::test]
async fn purge_is_refused_while_assignments_exist() -> Result<()> {
    let app = build_test_app().await?;
    let (admin_id, admin) = signed_in_admin(&app, "admin@example.com").await?;
    let (loner_id, _) = signed_in_user(&app.server, "Loner", "loner@example.com").await;

    app.server
        .delete(&format!("/api/v1/users/{admin_id}/purge"))
        .add_header("Authorization", bearer(&admin))
        .await
        .assert_status(StatusCode::CONFLICT);

    app.server
        .delete(&format!("/api/v1/users/{loner_id}/purge"))
        .add_header("Authorization", bearer(&admin))
        .await
        .assert_status_ok();

    assert!(app.state.users.get(loner_id).await.is_err());
    Ok(())
}

#[tokio::test]
async fn startup_promotes_the_bootstrap_admin_whatever_the_case() -> Result<()> {
    let app = build_test_app().await?;
    let (_, token) = signed_in_user(&app.server, "Root", "Root@Example.com").await;

    app.server
        .get("/api/v1/roles")
        .add_header("Authorization", bearer(&token))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    ProdStartupHooks {
        bootstrap_admin_email: Some("Root@Example.com".to_string()),
    }
    .run(&app.state)
    .await?;

    app.server
        .get("/api/v1/roles")
        .add_header("Authorization", bearer(&token))
        .await
        .assert_status_ok();
    Ok(())
}
