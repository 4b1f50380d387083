use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use gatehouse_core::MIGRATOR;

use crate::{
    infra::{app_state::AppState, config::Config},
    routes,
};

/// Work that runs once the state is built and before the listener binds.
#[async_trait]
pub trait StartupHooks: Send + Sync {
    async fn run(&self, state: &AppState) -> Result<()>;
}

/// Seeds RBAC defaults and optionally promotes a configured administrator.
#[derive(Debug, Default)]
pub struct ProdStartupHooks {
    pub bootstrap_admin_email: Option<String>,
}

#[async_trait]
impl StartupHooks for ProdStartupHooks {
    async fn run(&self, state: &AppState) -> Result<()> {
        let bootstrap = state.rbac_bootstrap();
        let admin_id = bootstrap
            .ensure_defaults()
            .await
            .context("failed to bootstrap RBAC defaults")?;
        info!(role_id = admin_id, "RBAC defaults ensured");

        if let Some(email) = self.bootstrap_admin_email.as_deref() {
            match bootstrap.promote_admin(email).await {
                Ok(true) => info!("bootstrap administrator promoted"),
                Ok(false) => {
                    warn!("BOOTSTRAP_ADMIN_EMAIL is set but no active user has that email yet")
                }
                Err(err) => warn!(error = %err, "failed to promote bootstrap administrator"),
            }
        }

        Ok(())
    }
}

/// Open the pool and bring the schema up to date.
pub async fn connect_database(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    MIGRATOR
        .run(&pool)
        .await
        .context("database migration failed")?;
    info!("database migrations applied");

    Ok(pool)
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
        .merge(routes::create_api_router(state.clone()))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn ping_handler() -> &'static str {
    "pong"
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Resolves on Ctrl-C, letting in-flight requests finish.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
