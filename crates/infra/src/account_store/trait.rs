use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use authgate_auth::{
    Account, AuthError, NewLinkedAccount, NewLocalAccount, Provider, ProviderMetadata,
};
use authgate_core::{AccountId, ExternalId};

/// Account store operation error.
///
/// These are **infrastructure errors**. Lookups that find nothing return
/// `Ok(None)`, not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the insert.
    #[error("uniqueness conflict: {0}")]
    Conflict(String),

    /// The backend could not serve the request (connection, timeout, lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be mapped back to an account.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<StoreError> for AuthError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => AuthError::StoreConflict(msg),
            StoreError::Unavailable(msg) | StoreError::Corrupt(msg) => {
                AuthError::StoreUnavailable(msg)
            }
        }
    }
}

/// Persistence boundary for accounts and provider metadata.
///
/// ## Implementation Requirements
///
/// Implementations must:
/// - assign account ids that are unique and never reused
/// - reject a second local account with the same username (`Conflict`)
/// - reject a second linked account with the same `(provider, external_id)` (`Conflict`)
/// - store a linked account and its metadata atomically (both or neither)
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Exact-match lookup among local-credential accounts.
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_external_id(
        &self,
        provider: Provider,
        external_id: &ExternalId,
    ) -> Result<Option<Account>, StoreError>;

    async fn metadata(&self, account_id: AccountId) -> Result<Option<ProviderMetadata>, StoreError>;

    async fn insert_local(&self, account: NewLocalAccount) -> Result<Account, StoreError>;

    /// Insert a linked account together with zeroed provider metadata.
    async fn insert_linked(
        &self,
        account: NewLinkedAccount,
    ) -> Result<(Account, ProviderMetadata), StoreError>;
}

#[async_trait]
impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        (**self).find_by_username(username).await
    }

    async fn find_by_external_id(
        &self,
        provider: Provider,
        external_id: &ExternalId,
    ) -> Result<Option<Account>, StoreError> {
        (**self).find_by_external_id(provider, external_id).await
    }

    async fn metadata(&self, account_id: AccountId) -> Result<Option<ProviderMetadata>, StoreError> {
        (**self).metadata(account_id).await
    }

    async fn insert_local(&self, account: NewLocalAccount) -> Result<Account, StoreError> {
        (**self).insert_local(account).await
    }

    async fn insert_linked(
        &self,
        account: NewLinkedAccount,
    ) -> Result<(Account, ProviderMetadata), StoreError> {
        (**self).insert_linked(account).await
    }
}
