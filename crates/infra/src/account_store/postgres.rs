//! Postgres-backed account store.
//!
//! Uniqueness lives in the schema (partial unique indexes on local usernames
//! and on `(kind, external_id)`); a unique violation surfaces as
//! `StoreError::Conflict`. Linked accounts and their metadata are written in
//! one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use authgate_auth::{
    Account, AccountKind, AccountStatus, AvatarRefs, NewLinkedAccount, NewLocalAccount,
    PasswordHash, Provider, ProviderMetadata, Role,
};
use authgate_core::{AccountId, ExternalId};

use super::r#trait::{AccountStore, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_accounts.sql");

const ACCOUNT_COLUMNS: &str = "id, kind, username, firstname, lastname, nickname, email, role, \
     status, password_hash, external_id, avatar_small, avatar_medium, avatar_full, created_at";

/// Postgres-backed account store.
///
/// `sqlx::PgPool` is internally reference counted, so cloning the store is cheap.
#[derive(Debug, Clone)]
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await.map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Create tables and unique indexes if they do not exist.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    fn select_where(predicate: &str) -> String {
        format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {predicate}")
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&Self::select_where("id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&Self::select_where("kind = 'local' AND username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_external_id(
        &self,
        provider: Provider,
        external_id: &ExternalId,
    ) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&Self::select_where("kind = $1 AND external_id = $2"))
            .bind(provider.as_str())
            .bind(external_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn metadata(&self, account_id: AccountId) -> Result<Option<ProviderMetadata>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT account_id, provider, external_id, points, vip_points
            FROM provider_metadata
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(metadata_from_row).transpose()
    }

    async fn insert_local(&self, new: NewLocalAccount) -> Result<Account, StoreError> {
        let sql = format!(
            "INSERT INTO accounts (kind, username, firstname, lastname, nickname, email, password_hash) \
             VALUES ('local', $1, $2, $3, $4, $5, $6) RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&new.username)
            .bind(&new.firstname)
            .bind(&new.lastname)
            .bind(&new.nickname)
            .bind(&new.email)
            .bind(new.password_hash.as_stored())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        account_from_row(&row)
    }

    async fn insert_linked(
        &self,
        new: NewLinkedAccount,
    ) -> Result<(Account, ProviderMetadata), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let sql = format!(
            "INSERT INTO accounts (kind, username, external_id, avatar_small, avatar_medium, avatar_full) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(new.provider.as_str())
            .bind(&new.username)
            .bind(new.external_id.as_str())
            .bind(&new.avatar.small)
            .bind(&new.avatar.medium)
            .bind(&new.avatar.full)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        let account = account_from_row(&row)?;

        let row = sqlx::query(
            r#"
            INSERT INTO provider_metadata (account_id, provider, external_id)
            VALUES ($1, $2, $3)
            RETURNING account_id, provider, external_id, points, vip_points
            "#,
        )
        .bind(account.id.get())
        .bind(new.provider.as_str())
        .bind(new.external_id.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        let metadata = metadata_from_row(&row)?;

        // Dropping `tx` on any error above rolls both inserts back.
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok((account, metadata))
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.constraint().unwrap_or("unique").to_string())
        }
        _ => StoreError::Unavailable(err.to_string()),
    }
}

fn corrupt(err: impl core::fmt::Display) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let kind: String = row.try_get("kind").map_err(corrupt)?;
    let status: String = row.try_get("status").map_err(corrupt)?;

    let kind = match kind.as_str() {
        "local" => {
            let hash: Option<String> = row.try_get("password_hash").map_err(corrupt)?;
            AccountKind::Local {
                password_hash: PasswordHash::from_stored(
                    hash.ok_or_else(|| corrupt("local account without password hash"))?,
                ),
            }
        }
        other => {
            let provider: Provider = other.parse().map_err(corrupt)?;
            let external_id: Option<String> = row.try_get("external_id").map_err(corrupt)?;
            let external_id = external_id.ok_or_else(|| corrupt("linked account without external id"))?;
            AccountKind::Linked {
                provider,
                external_id: ExternalId::new(external_id).map_err(corrupt)?,
                avatar: AvatarRefs {
                    small: row.try_get("avatar_small").map_err(corrupt)?,
                    medium: row.try_get("avatar_medium").map_err(corrupt)?,
                    full: row.try_get("avatar_full").map_err(corrupt)?,
                },
            }
        }
    };

    let status = match status.as_str() {
        "active" => AccountStatus::Active,
        "suspended" => AccountStatus::Suspended,
        other => return Err(corrupt(format!("unknown status '{other}'"))),
    };

    let role: String = row.try_get("role").map_err(corrupt)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(corrupt)?;

    Ok(Account {
        id: AccountId::new(row.try_get("id").map_err(corrupt)?),
        username: row.try_get("username").map_err(corrupt)?,
        firstname: row.try_get("firstname").map_err(corrupt)?,
        lastname: row.try_get("lastname").map_err(corrupt)?,
        nickname: row.try_get("nickname").map_err(corrupt)?,
        email: row.try_get("email").map_err(corrupt)?,
        role: Role::new(role),
        status,
        kind,
        created_at,
    })
}

fn metadata_from_row(row: &PgRow) -> Result<ProviderMetadata, StoreError> {
    let provider: String = row.try_get("provider").map_err(corrupt)?;
    let external_id: String = row.try_get("external_id").map_err(corrupt)?;
    Ok(ProviderMetadata {
        account_id: AccountId::new(row.try_get("account_id").map_err(corrupt)?),
        provider: provider.parse().map_err(corrupt)?,
        external_id: ExternalId::new(external_id).map_err(corrupt)?,
        points: row.try_get("points").map_err(corrupt)?,
        vip_points: row.try_get("vip_points").map_err(corrupt)?,
    })
}
