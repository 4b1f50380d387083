pub mod auth;
pub mod permission_handlers;
pub mod role_handlers;
pub mod user_handlers;
