use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use gatehouse_core::domain::rbac::{self, Capability};

use crate::{
    AppState,
    users::{
        auth::{self, auth_middleware, require_permission},
        permission_handlers, role_handlers, user_handlers,
    },
};

/// Create all v1 API routes
pub fn create_v1_router(state: AppState) -> Router<AppState> {
    Router::new()
        // Public authentication endpoints
        .route("/auth/register", post(auth::handlers::register))
        .route("/auth/login", post(auth::handlers::login))
        .merge(create_protected_routes(state.clone()))
        .merge(create_admin_routes(state))
}

/// Routes that only need a verified session
fn create_protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users/me", get(user_handlers::get_current_user))
        .route("/users", get(user_handlers::list_users_handler))
        .route(
            "/users/{id}",
            get(user_handlers::get_user_handler)
                .patch(user_handlers::update_user_handler)
                .delete(user_handlers::delete_user_handler),
        )
        .route(
            "/users/{id}/roles",
            get(user_handlers::get_user_roles_handler),
        )
        .route(
            "/users/{id}/permissions",
            get(user_handlers::get_user_permissions_handler),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Role, permission and assignment management, guarded by `rbac:manage`
fn create_admin_routes(state: AppState) -> Router<AppState> {
    let manage = Capability::new(
        rbac::permissions::RBAC_RESOURCE,
        rbac::permissions::MANAGE_ACTION,
    );

    Router::new()
        .route(
            "/roles",
            get(role_handlers::list_roles_handler)
                .post(role_handlers::create_role_handler),
        )
        .route(
            "/roles/{id}",
            get(role_handlers::get_role_handler)
                .patch(role_handlers::update_role_handler)
                .delete(role_handlers::delete_role_handler),
        )
        .route(
            "/roles/{id}/permissions",
            get(role_handlers::get_role_permissions_handler),
        )
        .route(
            "/roles/{id}/permissions/{permission_id}",
            post(role_handlers::grant_permission_handler)
                .delete(role_handlers::revoke_permission_handler),
        )
        .route(
            "/permissions",
            get(permission_handlers::list_permissions_handler)
                .post(permission_handlers::create_permission_handler),
        )
        .route(
            "/permissions/{id}",
            get(permission_handlers::get_permission_handler)
                .patch(permission_handlers::update_permission_handler)
                .delete(permission_handlers::delete_permission_handler),
        )
        .route(
            "/users/{id}/roles/{role_id}",
            post(user_handlers::assign_role_handler)
                .delete(user_handlers::revoke_role_handler),
        )
        .route("/users/{id}/purge", delete(user_handlers::purge_user_handler))
        // The last route_layer runs first, so the session check precedes the guard
        .route_layer(middleware::from_fn(require_permission(
            state.clone(),
            manage,
        )))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
