//! `authgate-auth` — session token protocol and account model.
//!
//! This crate is decoupled from HTTP and storage: it signs, verifies and
//! describes identities, nothing more.

pub mod account;
pub mod claims;
pub mod config;
pub mod error;
pub mod password;
pub mod roles;
pub mod token;

pub use account::{
    Account, AccountKind, AccountStatus, AuthVariant, AvatarRefs, ExternalProfile,
    NewLinkedAccount, NewLocalAccount, Provider, ProviderMetadata, validate_local_fields,
};
pub use claims::{DisplaySnapshot, SessionClaims, validate_claims};
pub use config::{SigningConfig, TokenConfig};
pub use error::{AuthError, ConfigError, TokenError};
pub use password::{PasswordError, PasswordHash};
pub use roles::Role;
pub use token::{KeyScope, SignedToken, TokenIssuer, TokenVerifier, strip_bearer};
