//! Find-or-create of provider-linked accounts.
//!
//! ```text
//! lookup (provider, external_id) ── found ──▶ Existing
//!        │ miss
//!        ▼
//! insert account + metadata ── ok ──▶ Created
//!        │ Conflict (lost a first-login race)
//!        └──▶ lookup again (bounded)
//! ```

use authgate_auth::{Account, AuthError, ExternalProfile, NewLinkedAccount};

use crate::account_store::{AccountStore, StoreError};

/// Lookups attempted before giving up on a conflicting identity.
pub const MAX_RESOLVE_ATTEMPTS: usize = 3;

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Created(Account),
    Existing(Account),
}

impl Resolution {
    pub fn account(&self) -> &Account {
        match self {
            Resolution::Created(a) | Resolution::Existing(a) => a,
        }
    }

    pub fn into_account(self) -> Account {
        match self {
            Resolution::Created(a) | Resolution::Existing(a) => a,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Resolution::Created(_))
    }
}

/// Maps an external profile to exactly one local account.
pub struct IdentityResolver<S> {
    store: S,
}

impl<S: AccountStore> IdentityResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Idempotent per `(provider, external_id)`; existing accounts are returned unchanged.
    pub async fn resolve(&self, profile: &ExternalProfile) -> Result<Resolution, AuthError> {
        for attempt in 1..=MAX_RESOLVE_ATTEMPTS {
            if let Some(account) = self
                .store
                .find_by_external_id(profile.provider, &profile.external_id)
                .await?
            {
                return Ok(Resolution::Existing(account));
            }

            match self.store.insert_linked(NewLinkedAccount::from_profile(profile)).await {
                Ok((account, _metadata)) => {
                    tracing::info!(
                        account_id = %account.id,
                        provider = %profile.provider,
                        "created linked account"
                    );
                    return Ok(Resolution::Created(account));
                }
                Err(StoreError::Conflict(reason)) => {
                    tracing::debug!(
                        attempt,
                        provider = %profile.provider,
                        %reason,
                        "concurrent first login, retrying lookup"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(
            provider = %profile.provider,
            external_id = %profile.external_id,
            "identity conflict persisted after retries"
        );
        Err(AuthError::StoreUnavailable(
            "identity resolution conflict not settled".to_string(),
        ))
    }
}
