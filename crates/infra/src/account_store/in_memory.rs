use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use authgate_auth::{
    Account, AccountKind, AccountStatus, NewLinkedAccount, NewLocalAccount, Provider,
    ProviderMetadata, Role,
};
use authgate_core::{AccountId, ExternalId};

use super::r#trait::{AccountStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    accounts: HashMap<AccountId, Account>,
    local_usernames: HashMap<String, AccountId>,
    external_ids: HashMap<(Provider, ExternalId), AccountId>,
    metadata: HashMap<AccountId, ProviderMetadata>,
}

impl Tables {
    fn next_id(&mut self) -> AccountId {
        self.last_id += 1;
        AccountId::new(self.last_id)
    }
}

/// In-memory account store.
///
/// Intended for tests/dev. Every insert checks its unique indexes and writes
/// all rows under one write lock, so a failed insert leaves nothing behind.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    tables: RwLock<Tables>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub fn account_count(&self) -> usize {
        self.tables.read().map(|t| t.accounts.len()).unwrap_or(0)
    }

    /// Number of stored provider metadata rows.
    pub fn metadata_count(&self) -> usize {
        self.tables.read().map(|t| t.metadata.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .local_usernames
            .get(username)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        provider: Provider,
        external_id: &ExternalId,
    ) -> Result<Option<Account>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .external_ids
            .get(&(provider, external_id.clone()))
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn metadata(&self, account_id: AccountId) -> Result<Option<ProviderMetadata>, StoreError> {
        Ok(self.read()?.metadata.get(&account_id).cloned())
    }

    async fn insert_local(&self, new: NewLocalAccount) -> Result<Account, StoreError> {
        let mut tables = self.write()?;
        if tables.local_usernames.contains_key(&new.username) {
            return Err(StoreError::Conflict(format!("username '{}'", new.username)));
        }

        let id = tables.next_id();
        let account = Account {
            id,
            username: new.username.clone(),
            firstname: new.firstname,
            lastname: new.lastname,
            nickname: new.nickname,
            email: new.email,
            role: Role::default(),
            status: AccountStatus::Active,
            kind: AccountKind::Local {
                password_hash: new.password_hash,
            },
            created_at: Utc::now(),
        };

        tables.local_usernames.insert(new.username, id);
        tables.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn insert_linked(
        &self,
        new: NewLinkedAccount,
    ) -> Result<(Account, ProviderMetadata), StoreError> {
        let mut tables = self.write()?;
        let key = (new.provider, new.external_id.clone());
        if tables.external_ids.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "{} id '{}'",
                new.provider, new.external_id
            )));
        }

        let id = tables.next_id();
        let account = Account {
            id,
            username: new.username,
            firstname: String::new(),
            lastname: String::new(),
            nickname: String::new(),
            email: None,
            role: Role::default(),
            status: AccountStatus::Active,
            kind: AccountKind::Linked {
                provider: new.provider,
                external_id: new.external_id.clone(),
                avatar: new.avatar,
            },
            created_at: Utc::now(),
        };
        let metadata = ProviderMetadata {
            account_id: id,
            provider: new.provider,
            external_id: new.external_id,
            points: 0,
            vip_points: 0,
        };

        tables.external_ids.insert(key, id);
        tables.accounts.insert(id, account.clone());
        tables.metadata.insert(id, metadata.clone());
        Ok((account, metadata))
    }
}

#[cfg(test)]
mod tests {
    use authgate_auth::{AvatarRefs, PasswordHash};

    use super::*;

    fn local(username: &str) -> NewLocalAccount {
        NewLocalAccount {
            username: username.to_string(),
            password_hash: PasswordHash::from_stored("$2b$04$x"),
            firstname: String::new(),
            lastname: String::new(),
            nickname: String::new(),
            email: None,
        }
    }

    fn linked(provider: Provider, id: &str) -> NewLinkedAccount {
        NewLinkedAccount {
            provider,
            external_id: ExternalId::new(id).unwrap(),
            username: "someone".into(),
            avatar: AvatarRefs::default(),
        }
    }

    #[tokio::test]
    async fn ids_are_unique_and_increasing() {
        let store = InMemoryAccountStore::new();
        let a = store.insert_local(local("a")).await.unwrap();
        let (b, _) = store.insert_linked(linked(Provider::Steam, "1")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = InMemoryAccountStore::new();
        store.insert_local(local("alice")).await.unwrap();
        let err = store.insert_local(local("alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.account_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_external_id_conflicts_without_partial_rows() {
        let store = InMemoryAccountStore::new();
        store.insert_linked(linked(Provider::Steam, "765")).await.unwrap();
        let err = store.insert_linked(linked(Provider::Steam, "765")).await.unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.account_count(), 1);
        assert_eq!(store.metadata_count(), 1);
    }

    #[tokio::test]
    async fn external_ids_are_scoped_per_provider() {
        let store = InMemoryAccountStore::new();
        store.insert_linked(linked(Provider::Steam, "765")).await.unwrap();
        store.insert_linked(linked(Provider::Discord, "765")).await.unwrap();
        assert_eq!(store.account_count(), 2);
    }

    #[tokio::test]
    async fn username_lookup_ignores_linked_accounts() {
        let store = InMemoryAccountStore::new();
        store.insert_linked(linked(Provider::Steam, "765")).await.unwrap();
        assert!(store.find_by_username("someone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn linked_insert_creates_zeroed_metadata() {
        let store = InMemoryAccountStore::new();
        let (account, meta) = store.insert_linked(linked(Provider::Steam, "765")).await.unwrap();

        assert_eq!(meta.points, 0);
        assert_eq!(meta.vip_points, 0);
        assert_eq!(store.metadata(account.id).await.unwrap(), Some(meta));
    }
}
