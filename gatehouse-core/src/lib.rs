//! # Gatehouse Core
//!
//! Authentication and role-based access control for the Gatehouse user
//! management backend.
//!
//! ## Overview
//!
//! - **Credential hashing**: Argon2id password hashes in PHC string form
//! - **Session tokens**: HS256-signed bearer tokens carrying the user's email
//! - **Identity store**: user records with soft delete and active-row email uniqueness
//! - **Access-control store**: roles, permissions, and their assignment to users
//! - **Services**: registration, login, and the single `authorize` choke point
//!
//! ## Architecture
//!
//! - [`domain`]: plain data types and input validation
//! - [`auth`]: credential hasher and token issuer
//! - [`database`]: repository ports plus PostgreSQL (and in-memory) adapters
//! - [`application`]: services composed from the ports
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gatehouse_core::{
//!     application::{auth_service::AuthService, unit_of_work::AppUnitOfWork},
//!     auth::{crypto::CredentialHasher, token::TokenIssuer},
//! };
//!
//! async fn sign_in(pool: sqlx::PgPool) -> gatehouse_core::error::Result<String> {
//!     let uow = AppUnitOfWork::postgres(pool);
//!     let service = AuthService::new(
//!         &uow,
//!         Arc::new(CredentialHasher::new()?),
//!         Arc::new(TokenIssuer::new("change-me", None)?),
//!     );
//!
//!     service.register("Alice", "alice@example.com", "hunter2hunter2").await?;
//!     service.login("alice@example.com", "hunter2hunter2").await
//! }
//! ```

/// Services composed from repository ports
pub mod application;
/// Password hashing and session token signing
pub mod auth;
/// Repository ports and their storage adapters
pub mod database;
/// Domain types and validation
pub mod domain;
/// Error taxonomy shared by every layer
pub mod error;

pub use error::{CoreError, Result};

/// Embedded schema migrations for the identity and RBAC tables.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
