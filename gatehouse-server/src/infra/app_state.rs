use std::{fmt, sync::Arc};

use sqlx::PgPool;

use gatehouse_core::application::{
    AccessControl, AppUnitOfWork, AuthService, RbacBootstrapService,
    UserService,
};
use gatehouse_core::auth::{CredentialHasher, TokenIssuer};

use crate::infra::config::{Config, ConfigError};

/// Shared handler state, built once by the composition root.
#[derive(Clone)]
pub struct AppState {
    pub unit_of_work: Arc<AppUnitOfWork>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub access: Arc<AccessControl>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("unit_of_work", &self.unit_of_work)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire services over an existing set of repositories.
    pub fn build(
        unit_of_work: AppUnitOfWork,
        hasher: CredentialHasher,
        tokens: TokenIssuer,
        default_role: Option<String>,
    ) -> Self {
        let auth = AuthService::new(
            &unit_of_work,
            Arc::new(hasher),
            Arc::new(tokens),
        )
        .with_default_role(default_role);

        Self {
            users: Arc::new(UserService::new(&unit_of_work)),
            access: Arc::new(AccessControl::new(&unit_of_work)),
            auth: Arc::new(auth),
            unit_of_work: Arc::new(unit_of_work),
        }
    }

    /// Production wiring: PostgreSQL repositories plus config-driven crypto.
    pub fn from_config(config: &Config, pool: PgPool) -> Result<Self, ConfigError> {
        Ok(Self::build(
            AppUnitOfWork::postgres(pool),
            config.credential_hasher()?,
            config.token_issuer()?,
            config.default_role.clone(),
        ))
    }

    pub fn rbac_bootstrap(&self) -> RbacBootstrapService {
        RbacBootstrapService::new(&self.unit_of_work)
    }
}
