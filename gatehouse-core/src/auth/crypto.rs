use argon2::{
    Algorithm, Argon2, Params, ParamsBuilder, Version,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
};
use password_hash::Error as PasswordHashError;
use rand::{TryRngCore, rngs::OsRng};
use thiserror::Error;

/// One-way password hashing with Argon2id.
///
/// Every hash gets a fresh random salt, so hashing the same password twice
/// yields different PHC strings that both verify. Cost is tunable through
/// [`CredentialHasher::with_cost`]; the defaults target ~64 MiB and 3 passes.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid Argon2 parameters: {0}")]
    InvalidParams(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

impl CredentialHasher {
    const DEFAULT_MEMORY_KIB: u32 = 64 * 1024; // 64 MiB
    const DEFAULT_ITERATIONS: u32 = 3;
    const DEFAULT_PARALLELISM: u32 = 1;
    const SALT_LENGTH: usize = password_hash::Salt::RECOMMENDED_LENGTH;

    /// Build a hasher with default Argon2id parameters.
    pub fn new() -> Result<Self, CryptoError> {
        Self::with_cost(
            Self::DEFAULT_MEMORY_KIB,
            Self::DEFAULT_ITERATIONS,
            Self::DEFAULT_PARALLELISM,
        )
    }

    /// Build a hasher with caller-chosen cost (memory in KiB, passes, lanes).
    pub fn with_cost(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, CryptoError> {
        let params = ParamsBuilder::new()
            .m_cost(memory_kib)
            .t_cost(iterations)
            .p_cost(parallelism)
            .output_len(32)
            .build()
            .map_err(|err| CryptoError::InvalidParams(err.to_string()))?;

        Ok(Self::with_params(params))
    }

    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::default(), params),
        }
    }

    /// Hash a plaintext password into a PHC string suitable for storage.
    pub fn hash(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut salt_bytes = [0u8; Self::SALT_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|err| CryptoError::Hashing(err.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|err| CryptoError::Hashing(err.to_string()))?;

        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|err| CryptoError::Hashing(err.to_string()))?
            .to_string();
        Ok(hash)
    }

    /// Check a plaintext password against a stored PHC string.
    ///
    /// A mismatch is `Ok(false)`; only a stored value that is not a PHC
    /// string is an error.
    pub fn verify(
        &self,
        plaintext: &str,
        hash: &str,
    ) -> Result<bool, CryptoError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|err| CryptoError::MalformedHash(err.to_string()))?;

        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(err) => Err(CryptoError::MalformedHash(err.to_string())),
        }
    }
}
