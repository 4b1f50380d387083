use thiserror::Error;

use crate::auth::{crypto::CryptoError, token::TokenError};
use crate::domain::validation::ValidationError;

/// Error taxonomy surfaced by stores and services.
///
/// Store failures are normalized into these variants at the repository
/// boundary; services propagate them unchanged. Messages never contain raw
/// database text.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0} already exists")]
    UniqueViolation(String),

    #[error("{0} references a missing or deleted record")]
    ForeignKeyViolation(String),

    #[error("{0} is missing a required field")]
    NotNullViolation(String),

    #[error("Database error while accessing {0}")]
    Database(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("No {0} was affected")]
    NoRowsAffected(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl CoreError {
    /// True for the "target row absent" family (`NotFound`, `NoRowsAffected`).
    pub fn is_missing(&self) -> bool {
        matches!(self, CoreError::NotFound(_) | CoreError::NoRowsAffected(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
