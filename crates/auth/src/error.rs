//! Error taxonomy for the authentication core.

use thiserror::Error;

/// Why a presented token was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is missing")]
    Missing,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("token algorithm rejected: {0}")]
    AlgorithmRejected(String),

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token claims are malformed: {0}")]
    MalformedClaims(String),

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Errors surfaced by login and session flows.
///
/// Credential and token variants are safe to show to callers (generically).
/// Provider and store variants carry internal detail for the log only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown username or wrong password. Deliberately indistinguishable.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("token expired")]
    TokenExpired,

    #[error("token not yet valid")]
    TokenNotYetValid,

    #[error("token malformed: {0}")]
    TokenMalformed(String),

    #[error("token signature invalid")]
    TokenSignatureInvalid,

    /// Token verified but its subject no longer resolves to an account.
    #[error("token subject not found")]
    SubjectNotFound,

    #[error("username already taken")]
    UsernameTaken,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("identity provider does not know this identity")]
    UnknownExternalIdentity,

    /// Uniqueness conflict. Retried internally, never surfaced by the facade.
    #[error("store conflict: {0}")]
    StoreConflict(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TokenError> for AuthError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::NotYetValid => AuthError::TokenNotYetValid,
            TokenError::SignatureInvalid | TokenError::AlgorithmRejected(_) => {
                AuthError::TokenSignatureInvalid
            }
            TokenError::Missing => AuthError::TokenMalformed("missing".to_string()),
            TokenError::Malformed(msg) | TokenError::MalformedClaims(msg) => {
                AuthError::TokenMalformed(msg)
            }
            TokenError::Signing(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<authgate_core::DomainError> for AuthError {
    fn from(value: authgate_core::DomainError) -> Self {
        AuthError::Validation(value.to_string())
    }
}

/// Startup configuration failure. The only fatal error class.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("setting {0} must not be empty")]
    EmptySecret(&'static str),

    #[error("setting {key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}
