use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::application::unit_of_work::AppUnitOfWork;
use crate::auth::crypto::{CredentialHasher, CryptoError};
use crate::auth::token::{SessionClaims, TokenIssuer};
use crate::database::ports::{UserRolesRepository, UsersRepository};
use crate::domain::rbac::Capability;
use crate::domain::users::{NewUser, User};
use crate::domain::validation::{Email, Registration};
use crate::error::{CoreError, Result};

/// Plaintext hashed once per service to equalize unknown-email logins.
const TIMING_DECOY: &str = "gatehouse-timing-decoy";

/// Registration, login and the single authorization check.
///
/// Every permission decision in the system goes through [`AuthService::authorize`].
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepository>,
    user_roles: Arc<dyn UserRolesRepository>,
    hasher: Arc<CredentialHasher>,
    tokens: Arc<TokenIssuer>,
    default_role: Option<String>,
    decoy_hash: Arc<OnceLock<Option<String>>>,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("tokens", &self.tokens)
            .field("default_role", &self.default_role)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(
        uow: &AppUnitOfWork,
        hasher: Arc<CredentialHasher>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            users: Arc::clone(&uow.users),
            user_roles: Arc::clone(&uow.user_roles),
            hasher,
            tokens,
            default_role: None,
            decoy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Assign `role` to every newly registered user, atomically with the
    /// user insert.
    pub fn with_default_role(mut self, role: Option<String>) -> Self {
        self.default_role = role.filter(|name| !name.trim().is_empty());
        self
    }

    /// Validate, hash and store a new user. Returns the new user id.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<i64> {
        let Registration {
            name,
            email,
            password,
        } = Registration::parse(name, email, password)?;

        let plaintext = Zeroizing::new(password.expose().to_string());
        let password_hash = self.hash(plaintext).await?;

        let new_user = NewUser {
            name,
            email: email.into_string(),
            password_hash,
        };

        let user_id = match &self.default_role {
            Some(role) => self.users.create_with_role(&new_user, role).await?,
            None => self.users.create(&new_user).await?,
        };

        info!(user_id, "registered user");
        Ok(user_id)
    }

    /// Check credentials and issue a session token.
    ///
    /// An unknown email and a wrong password both yield
    /// `CoreError::InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let email = Email::parse(email)?;
        let plaintext = Zeroizing::new(password.to_string());

        let user = match self.users.get_by_email(email.as_str()).await {
            Ok(user) => user,
            Err(CoreError::NotFound(_)) => {
                self.burn_decoy(plaintext).await;
                warn!("login rejected: unknown email");
                return Err(CoreError::InvalidCredentials);
            }
            Err(err) => return Err(err),
        };

        if !self.verify(plaintext, user.password_hash.clone()).await? {
            warn!(user_id = user.id, "login rejected: wrong password");
            return Err(CoreError::InvalidCredentials);
        }

        let token = self.tokens.issue_for(user.id, &user.email)?;
        info!(user_id = user.id, "issued session token");
        Ok(token)
    }

    /// Verify a bearer token and return its claims.
    pub fn verify_token(&self, token: &str) -> Result<SessionClaims> {
        self.tokens.verify(token).map_err(|err| {
            debug!(error = %err, "token rejected");
            CoreError::from(err)
        })
    }

    /// Resolve a verified token identity (`sub`, `email`) to the active user
    /// it was issued for.
    ///
    /// The user is looked up by id and must still carry the token's email, so
    /// a token never follows an email address to a different account.
    pub async fn identify(&self, user_id: i64, email: &str) -> Result<User> {
        let user = self.users.get_by_id(user_id).await?;
        if user.email != email {
            debug!(user_id = user.id, "token email no longer matches the account");
            return Err(CoreError::NotFound("user".to_string()));
        }
        Ok(user)
    }

    /// True when any active role held by the user grants `capability`.
    pub async fn authorize(
        &self,
        user_id: i64,
        capability: &Capability,
    ) -> Result<bool> {
        let allowed = self.user_roles.has_permission(user_id, capability).await?;
        debug!(user_id, %capability, allowed, "authorization decision");
        Ok(allowed)
    }

    /// [`AuthService::authorize`] keyed by permission name.
    pub async fn authorize_named(
        &self,
        user_id: i64,
        permission_name: &str,
    ) -> Result<bool> {
        let allowed = self
            .user_roles
            .has_permission_named(user_id, permission_name)
            .await?;
        debug!(user_id, permission = permission_name, allowed, "authorization decision");
        Ok(allowed)
    }

    async fn hash(&self, plaintext: Zeroizing<String>) -> Result<String> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|err| CryptoError::Hashing(err.to_string()))?
            .map_err(CoreError::from)
    }

    async fn verify(
        &self,
        plaintext: Zeroizing<String>,
        hash: String,
    ) -> Result<bool> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hash))
            .await
            .map_err(|err| CryptoError::Hashing(err.to_string()))?
            .map_err(CoreError::from)
    }

    /// Spend one verification on a fixed hash so unknown emails cost the
    /// same as wrong passwords.
    async fn burn_decoy(&self, plaintext: Zeroizing<String>) {
        let hasher = Arc::clone(&self.hasher);
        let decoy = Arc::clone(&self.decoy_hash);
        let _ = tokio::task::spawn_blocking(move || {
            let hash = decoy.get_or_init(|| hasher.hash(TIMING_DECOY).ok());
            if let Some(hash) = hash {
                let _ = hasher.verify(&plaintext, hash);
            }
        })
        .await;
    }
}
