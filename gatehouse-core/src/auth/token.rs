use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims embedded in a session token.
///
/// `sub` is the user id and `email` the identity claim; a token only
/// resolves while both still name the same active user. `exp` is present only
/// when the issuer was configured with a time-to-live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: i64,
    pub email: String,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Wire shape used while decoding so absent claims can be reported by name.
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<i64>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    exp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    InvalidToken,
    #[error("token signature does not match")]
    Signature,
    #[error("token is missing the '{0}' claim")]
    MissingClaim(&'static str),
    #[error("token has expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl TokenError {
    /// Message safe to return to a client.
    ///
    /// Structural and signature failures read the same so a caller cannot
    /// tell which check rejected the token.
    pub fn public_message(&self) -> &'static str {
        match self {
            TokenError::InvalidToken | TokenError::Signature => "invalid token",
            TokenError::MissingClaim(_) => "invalid token: identity claim missing",
            TokenError::Expired => "token has expired",
            TokenError::Signing(_) => "failed to issue token",
        }
    }
}

/// Signs and verifies HS256 session tokens with a process-wide secret.
///
/// Built once at startup and shared behind `Arc`; it holds no mutable state.
/// Changing the secret invalidates every token issued under the old one.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Option<Duration>,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    const ALGORITHM: Algorithm = Algorithm::HS256;

    /// `ttl = None` issues tokens without an `exp` claim (valid until the
    /// secret changes).
    pub fn new(
        secret: impl AsRef<[u8]>,
        ttl: Option<Duration>,
    ) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::Signing(
                "signing secret is empty".to_string(),
            ));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        })
    }

    /// Claims for a fresh token identifying user `user_id` with `email`.
    pub fn claims_for(&self, user_id: i64, email: &str) -> SessionClaims {
        let now = Utc::now();
        SessionClaims {
            sub: user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: self.ttl.map(|ttl| (now + ttl).timestamp()),
        }
    }

    pub fn issue(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        encode(&Header::new(Self::ALGORITHM), claims, &self.encoding)
            .map_err(|err| TokenError::Signing(err.to_string()))
    }

    pub fn issue_for(
        &self,
        user_id: i64,
        email: &str,
    ) -> Result<String, TokenError> {
        self.issue(&self.claims_for(user_id, email))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(Self::ALGORITHM);
        validation.required_spec_claims.clear();
        validation.leeway = 0;
        validation.validate_exp = self.ttl.is_some();
        if self.ttl.is_some() {
            validation.required_spec_claims.insert("exp".to_string());
        }

        let data = decode::<RawClaims>(token, &self.decoding, &validation)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidSignature => TokenError::Signature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::MissingRequiredClaim(_) => {
                    TokenError::MissingClaim("exp")
                }
                _ => TokenError::InvalidToken,
            })?;

        let raw = data.claims;
        let email = raw
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or(TokenError::MissingClaim("email"))?;
        let sub = raw.sub.ok_or(TokenError::MissingClaim("sub"))?;
        let iat = raw.iat.ok_or(TokenError::MissingClaim("iat"))?;

        Ok(SessionClaims {
            sub,
            email,
            iat,
            exp: raw.exp,
        })
    }
}
