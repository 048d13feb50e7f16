//! Account records and the provider-supplied profiles they are derived from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use authgate_core::{AccountId, DomainError, Entity, ExternalId};

use crate::password::PasswordHash;
use crate::Role;

// ─────────────────────────────────────────────────────────────────────────────
// Provider / auth variant
// ─────────────────────────────────────────────────────────────────────────────

/// Third-party identity provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Steam,
    Discord,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Steam => "steam",
            Provider::Discord => "discord",
        }
    }
}

impl core::fmt::Display for Provider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Provider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "steam" => Ok(Provider::Steam),
            "discord" => Ok(Provider::Discord),
            other => Err(DomainError::validation(format!("unknown provider '{other}'"))),
        }
    }
}

/// How a session was established. Carried in the token as `auth_type`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthVariant {
    Local,
    Steam,
    Discord,
}

impl AuthVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthVariant::Local => "local",
            AuthVariant::Steam => "steam",
            AuthVariant::Discord => "discord",
        }
    }

    pub fn provider(self) -> Option<Provider> {
        match self {
            AuthVariant::Local => None,
            AuthVariant::Steam => Some(Provider::Steam),
            AuthVariant::Discord => Some(Provider::Discord),
        }
    }
}

impl From<Provider> for AuthVariant {
    fn from(value: Provider) -> Self {
        match value {
            Provider::Steam => AuthVariant::Steam,
            Provider::Discord => AuthVariant::Discord,
        }
    }
}

impl core::fmt::Display for AuthVariant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Account
// ─────────────────────────────────────────────────────────────────────────────

/// Account status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
}

/// Avatar image references supplied by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AvatarRefs {
    #[serde(default)]
    pub small: String,
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub full: String,
}

/// The identity an account was created with. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountKind {
    Local {
        password_hash: PasswordHash,
    },
    Linked {
        provider: Provider,
        external_id: ExternalId,
        avatar: AvatarRefs,
    },
}

/// A persisted account.
///
/// # Invariants
/// - `id` is assigned by the store, unique and never reused.
/// - `(provider, external_id)` is unique for linked accounts.
/// - `username` is unique among local accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub nickname: String,
    pub email: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub kind: AccountKind,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// The variant a session for this account is issued under.
    pub fn auth_variant(&self) -> AuthVariant {
        match &self.kind {
            AccountKind::Local { .. } => AuthVariant::Local,
            AccountKind::Linked { provider, .. } => (*provider).into(),
        }
    }

    pub fn password_hash(&self) -> Option<&PasswordHash> {
        match &self.kind {
            AccountKind::Local { password_hash } => Some(password_hash),
            AccountKind::Linked { .. } => None,
        }
    }

    pub fn avatar(&self) -> Option<&AvatarRefs> {
        match &self.kind {
            AccountKind::Local { .. } => None,
            AccountKind::Linked { avatar, .. } => Some(avatar),
        }
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> AccountId {
        self.id
    }
}

/// Per-provider bookkeeping created together with a linked account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub account_id: AccountId,
    pub provider: Provider,
    pub external_id: ExternalId,
    pub points: i64,
    pub vip_points: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Inserts
// ─────────────────────────────────────────────────────────────────────────────

/// A local-credential account that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewLocalAccount {
    pub username: String,
    pub password_hash: PasswordHash,
    pub firstname: String,
    pub lastname: String,
    pub nickname: String,
    pub email: Option<String>,
}

impl NewLocalAccount {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_local_fields(&self.username, self.email.as_deref())
    }
}

/// Username and email rules for local accounts. Cheap; run before hashing.
pub fn validate_local_fields(username: &str, email: Option<&str>) -> Result<(), DomainError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("username must not be empty"));
    }
    if trimmed != username {
        return Err(DomainError::validation(
            "username must not have surrounding whitespace",
        ));
    }
    if trimmed.len() > 64 {
        return Err(DomainError::validation("username must be at most 64 characters"));
    }
    if let Some(email) = email {
        if !email.contains('@') {
            return Err(DomainError::validation("email is invalid"));
        }
    }
    Ok(())
}

/// A provider-linked account derived from an [`ExternalProfile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLinkedAccount {
    pub provider: Provider,
    pub external_id: ExternalId,
    pub username: String,
    pub avatar: AvatarRefs,
}

impl NewLinkedAccount {
    pub fn from_profile(profile: &ExternalProfile) -> Self {
        Self {
            provider: profile.provider,
            external_id: profile.external_id.clone(),
            username: profile.display_name.clone(),
            avatar: profile.avatar.clone(),
        }
    }
}

/// Transient profile fetched from a provider. Never stored as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalProfile {
    pub provider: Provider,
    pub external_id: ExternalId,
    pub display_name: String,
    pub avatar: AvatarRefs,
}
