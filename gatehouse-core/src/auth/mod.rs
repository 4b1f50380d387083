pub mod crypto;
pub mod token;

pub use crypto::{CredentialHasher, CryptoError};
pub use token::{SessionClaims, TokenError, TokenIssuer};
