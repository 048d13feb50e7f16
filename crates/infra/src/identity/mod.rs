//! Identity establishment: local credentials and provider-linked accounts.

pub mod credentials;
pub mod resolver;

pub use credentials::CredentialVerifier;
pub use resolver::{IdentityResolver, MAX_RESOLVE_ATTEMPTS, Resolution};
