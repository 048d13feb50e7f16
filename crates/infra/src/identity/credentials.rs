//! Username/password verification against stored bcrypt hashes.

use authgate_auth::{Account, AuthError, PasswordError, PasswordHash};

use crate::account_store::AccountStore;

/// Checks a username/password pair. Read-only; no retries.
///
/// Every failure (unknown username, provider-linked account, wrong password)
/// is the same `InvalidCredentials`. Unknown usernames are still run through a
/// bcrypt comparison against a decoy hash of the same cost.
pub struct CredentialVerifier<S> {
    store: S,
    decoy: PasswordHash,
}

impl<S: AccountStore> CredentialVerifier<S> {
    pub fn new(store: S, cost: u32) -> Result<Self, PasswordError> {
        let decoy = PasswordHash::hash("authgate-decoy-password", cost)?;
        Ok(Self { store, decoy })
    }

    pub async fn verify(&self, username: &str, password: &str) -> Result<Account, AuthError> {
        let account = self.store.find_by_username(username).await?;

        let hash = account
            .as_ref()
            .and_then(Account::password_hash)
            .unwrap_or(&self.decoy)
            .clone();
        let password = password.to_string();

        let matches = tokio::task::spawn_blocking(move || hash.verify(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("password check aborted: {e}")))?;

        match account {
            Some(account) if matches && account.password_hash().is_some() => Ok(account),
            _ => {
                tracing::debug!("credential check failed");
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}
