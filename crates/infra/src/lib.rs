//! Infrastructure layer: account storage, identity providers, the session
//! facade and process configuration.

pub mod account_store;
pub mod config;
pub mod identity;
pub mod providers;
pub mod session;

pub use account_store::{AccountStore, InMemoryAccountStore, PostgresAccountStore, StoreError};
pub use config::AuthConfig;
pub use identity::{CredentialVerifier, IdentityResolver, Resolution};
pub use providers::{
    DiscordConfig, DiscordOAuth, OAuthProvider, ProviderError, ProviderToken, SteamProfiles,
    SteamWebApi,
};
pub use session::{LocalLogin, ProviderLogin, Registration, SessionService, SessionSettings, UserDetail};
