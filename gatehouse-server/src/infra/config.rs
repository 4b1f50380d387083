use std::fmt;
use std::net::SocketAddr;

use chrono::Duration;
use clap::Args as ClapArgs;
use thiserror::Error;
use tracing::warn;

use gatehouse_core::auth::{CredentialHasher, CryptoError, TokenError, TokenIssuer};

/// Signing secret used when `JWT_SECRET` is unset. Development only.
pub const FALLBACK_JWT_SECRET: &str = "default_secret_key";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid listen address {0}")]
    ListenAddress(String),
    #[error("TOKEN_TTL_SECS must be positive, got {0}")]
    TokenTtl(i64),
    #[error(transparent)]
    Hasher(#[from] CryptoError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Runtime configuration, read from flags or the environment after `.env`
/// has been loaded.
#[derive(ClapArgs, Clone)]
pub struct Config {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Interface to bind
    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(short, long, env = "SERVER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Upper bound on pooled database connections
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// HS256 signing secret for session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Token lifetime in seconds; unset issues tokens without expiry
    #[arg(long, env = "TOKEN_TTL_SECS")]
    pub token_ttl_secs: Option<i64>,

    /// Argon2 memory cost in KiB
    #[arg(long, env = "ARGON2_MEMORY_KIB", default_value_t = 64 * 1024)]
    pub argon2_memory_kib: u32,

    /// Argon2 passes
    #[arg(long, env = "ARGON2_ITERATIONS", default_value_t = 3)]
    pub argon2_iterations: u32,

    /// Argon2 lanes
    #[arg(long, env = "ARGON2_PARALLELISM", default_value_t = 1)]
    pub argon2_parallelism: u32,

    /// Role assigned to every new registration
    #[arg(long, env = "DEFAULT_ROLE")]
    pub default_role: Option<String>,

    /// Existing user promoted to admin at startup
    #[arg(long, env = "BOOTSTRAP_ADMIN_EMAIL")]
    pub bootstrap_admin_email: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_connections", &self.max_connections)
            .field("jwt_secret_set", &self.jwt_secret.is_some())
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("argon2_memory_kib", &self.argon2_memory_kib)
            .field("argon2_iterations", &self.argon2_iterations)
            .field("argon2_parallelism", &self.argon2_parallelism)
            .field("default_role", &self.default_role)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::ListenAddress(raw))
    }

    pub fn jwt_secret(&self) -> &str {
        match self.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET is not set; using the built-in development secret");
                FALLBACK_JWT_SECRET
            }
        }
    }

    pub fn token_ttl(&self) -> Result<Option<Duration>, ConfigError> {
        match self.token_ttl_secs {
            None => Ok(None),
            Some(secs) if secs > 0 => Ok(Some(Duration::seconds(secs))),
            Some(secs) => Err(ConfigError::TokenTtl(secs)),
        }
    }

    pub fn credential_hasher(&self) -> Result<CredentialHasher, ConfigError> {
        Ok(CredentialHasher::with_cost(
            self.argon2_memory_kib,
            self.argon2_iterations,
            self.argon2_parallelism,
        )?)
    }

    pub fn token_issuer(&self) -> Result<TokenIssuer, ConfigError> {
        Ok(TokenIssuer::new(self.jwt_secret(), self.token_ttl()?)?)
    }
}
