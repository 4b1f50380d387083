//! HTTP front end for Gatehouse.
//!
//! Exposes registration and login, the bearer-token session middleware, and
//! the role/permission management routes over the services in
//! `gatehouse-core`. The binary in `main.rs` is a thin wrapper around
//! [`infra::startup`].

pub mod api_types;
pub mod infra;
pub mod routes;
pub mod users;

pub use infra::app_state::AppState;
pub use infra::startup::create_app;
