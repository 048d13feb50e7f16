//! Session facade: login flows and session introspection.
//!
//! ```text
//! Anonymous ── credentials ──────▶ Authenticating ── ok ──▶ Authenticated (token issued)
//! Anonymous ── external profile ─▶ Authenticating ── ok ──▶ Authenticated (token issued)
//!                                        └── failure ─▶ Rejected
//! Authenticated ── present token ─▶ Authenticated | Rejected
//! ```
//!
//! Tokens are stateless and self-expiring; there is no logout transition.
//! Every store and provider call runs under the configured request timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use authgate_auth::{
    Account, AccountStatus, AuthError, AuthVariant, AvatarRefs, ConfigError, ExternalProfile,
    NewLocalAccount, PasswordHash, ProviderMetadata, SessionClaims, SignedToken, TokenConfig,
    TokenIssuer, TokenVerifier, validate_local_fields,
};
use authgate_core::{AccountId, ExternalId};

use crate::account_store::{AccountStore, StoreError};
use crate::identity::{CredentialVerifier, IdentityResolver};
use crate::providers::{OAuthProvider, ProviderError, SteamProfiles};

/// Immutable settings shared by every request.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub tokens: Arc<TokenConfig>,
    pub bcrypt_cost: u32,
    pub request_timeout: Duration,
}

/// Input for creating a local-credential account.
#[derive(Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
    pub nickname: String,
    pub email: Option<String>,
}

/// Result of a successful credential login.
#[derive(Debug, Clone)]
pub struct LocalLogin {
    pub token: SignedToken,
    pub account: Account,
}

/// Result of a successful provider login.
#[derive(Debug, Clone)]
pub struct ProviderLogin {
    pub token: SignedToken,
    pub profile: ExternalProfile,
    pub account: Account,
    pub created: bool,
}

/// Live projection of the account behind a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDetail {
    pub id: AccountId,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub nickname: String,
    pub email: Option<String>,
    pub role: String,
    pub status: AccountStatus,
    pub auth_type: AuthVariant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<AvatarRefs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip_points: Option<i64>,
}

pub struct SessionService<S> {
    store: S,
    credentials: CredentialVerifier<S>,
    resolver: IdentityResolver<S>,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    steam: Option<Arc<dyn SteamProfiles>>,
    discord: Option<Arc<dyn OAuthProvider>>,
    bcrypt_cost: u32,
    timeout: Duration,
}

impl<S> SessionService<S>
where
    S: AccountStore + Clone,
{
    pub fn new(store: S, settings: SessionSettings) -> Result<Self, ConfigError> {
        let credentials = CredentialVerifier::new(store.clone(), settings.bcrypt_cost).map_err(|e| {
            ConfigError::Invalid {
                key: "BCRYPT_COST",
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            resolver: IdentityResolver::new(store.clone()),
            credentials,
            issuer: TokenIssuer::new(settings.tokens.clone()),
            verifier: TokenVerifier::new(&settings.tokens),
            store,
            steam: None,
            discord: None,
            bcrypt_cost: settings.bcrypt_cost,
            timeout: settings.request_timeout,
        })
    }

    pub fn with_steam(mut self, steam: Arc<dyn SteamProfiles>) -> Self {
        self.steam = Some(steam);
        self
    }

    pub fn with_discord(mut self, discord: Arc<dyn OAuthProvider>) -> Self {
        self.discord = Some(discord);
        self
    }

    // ─────────────────────────────────────────────────────────────────────
    // Local credentials
    // ─────────────────────────────────────────────────────────────────────

    pub async fn register(&self, registration: Registration) -> Result<Account, AuthError> {
        let Registration {
            username,
            password,
            firstname,
            lastname,
            nickname,
            email,
        } = registration;

        validate_local_fields(&username, email.as_deref())?;

        let cost = self.bcrypt_cost;
        let password_hash = tokio::task::spawn_blocking(move || PasswordHash::hash(&password, cost))
            .await
            .map_err(|e| AuthError::Internal(format!("password hashing aborted: {e}")))?
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let new = NewLocalAccount {
            username,
            password_hash,
            firstname,
            lastname,
            nickname,
            email,
        };

        let inserted = self
            .within_store(async { self.store.insert_local(new).await.map_err(AuthError::from) })
            .await;

        match inserted {
            Ok(account) => {
                tracing::info!(account_id = %account.id, "registered local account");
                Ok(account)
            }
            Err(AuthError::StoreConflict(_)) => Err(AuthError::UsernameTaken),
            Err(e) => Err(observe("register", e)),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LocalLogin, AuthError> {
        let account = self
            .within_store(self.credentials.verify(username, password))
            .await
            .map_err(|e| observe("login", e))?;

        let token = self.issue(&account, AuthVariant::Local)?;
        tracing::info!(account_id = %account.id, auth_type = "local", "login succeeded");
        Ok(LocalLogin { token, account })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Providers
    // ─────────────────────────────────────────────────────────────────────

    pub async fn login_with_steam(&self, steam_id: &str) -> Result<ProviderLogin, AuthError> {
        let steam_id = ExternalId::steam(steam_id)?;
        let steam = self
            .steam
            .as_ref()
            .ok_or_else(|| AuthError::ProviderUnavailable("steam login is not configured".into()))?;

        let profile = self
            .within_provider(steam.fetch_profile(&steam_id))
            .await
            .map_err(|e| observe("steam", e))?;

        self.complete_provider_login(profile).await
    }

    pub fn discord_authorize_url(&self) -> Result<String, AuthError> {
        self.discord
            .as_ref()
            .map(|d| d.authorize_url())
            .ok_or_else(|| AuthError::ProviderUnavailable("discord login is not configured".into()))
    }

    pub async fn login_with_discord(&self, code: &str) -> Result<ProviderLogin, AuthError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::Validation("authorization code is required".into()));
        }
        let discord = self
            .discord
            .as_ref()
            .ok_or_else(|| AuthError::ProviderUnavailable("discord login is not configured".into()))?;

        let token = self
            .within_provider(discord.exchange_code(code))
            .await
            .map_err(|e| observe("discord", e))?;
        let profile = self
            .within_provider(discord.fetch_user(&token))
            .await
            .map_err(|e| observe("discord", e))?;

        self.complete_provider_login(profile).await
    }

    async fn complete_provider_login(
        &self,
        profile: ExternalProfile,
    ) -> Result<ProviderLogin, AuthError> {
        let resolution = self
            .within_store(self.resolver.resolve(&profile))
            .await
            .map_err(|e| observe("resolve", e))?;

        let created = resolution.is_created();
        let account = resolution.into_account();
        let variant = AuthVariant::from(profile.provider);
        let token = self.issue(&account, variant)?;

        tracing::info!(
            account_id = %account.id,
            auth_type = %variant,
            created,
            "login succeeded"
        );
        Ok(ProviderLogin {
            token,
            profile,
            account,
            created,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────

    /// Stateless verification: signature, algorithm, time window.
    pub fn verify(&self, raw: &str) -> Result<SessionClaims, AuthError> {
        self.verifier.verify(raw, Utc::now()).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            AuthError::from(e)
        })
    }

    /// Verify a token and project the live account it names.
    pub async fn session(&self, raw: &str) -> Result<UserDetail, AuthError> {
        let claims = self.verify(raw)?;
        self.user_detail(&claims).await
    }

    /// Re-fetch live attributes for an already verified subject.
    pub async fn user_detail(&self, claims: &SessionClaims) -> Result<UserDetail, AuthError> {
        let (account, metadata) = self
            .within_store(async { self.load_subject(claims.sub).await.map_err(AuthError::from) })
            .await
            .map_err(|e| observe("session", e))?
            .ok_or(AuthError::SubjectNotFound)?;

        Ok(UserDetail {
            id: account.id,
            auth_type: account.auth_variant(),
            avatar: account.avatar().cloned(),
            username: account.username,
            firstname: account.firstname,
            lastname: account.lastname,
            nickname: account.nickname,
            email: account.email,
            role: account.role.to_string(),
            status: account.status,
            points: metadata.as_ref().map(|m| m.points),
            vip_points: metadata.as_ref().map(|m| m.vip_points),
        })
    }

    async fn load_subject(
        &self,
        id: AccountId,
    ) -> Result<Option<(Account, Option<ProviderMetadata>)>, StoreError> {
        let Some(account) = self.store.find_by_id(id).await? else {
            return Ok(None);
        };
        let metadata = match account.auth_variant() {
            AuthVariant::Local => None,
            _ => self.store.metadata(account.id).await?,
        };
        Ok(Some((account, metadata)))
    }

    fn issue(&self, account: &Account, variant: AuthVariant) -> Result<SignedToken, AuthError> {
        self.issuer
            .issue(account, variant, Utc::now())
            .map_err(|e| observe("issue", e.into()))
    }

    async fn within_store<T>(
        &self,
        fut: impl Future<Output = Result<T, AuthError>>,
    ) -> Result<T, AuthError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| AuthError::StoreUnavailable("store call timed out".to_string()))?
    }

    async fn within_provider<T>(
        &self,
        fut: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, AuthError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(AuthError::from),
            Err(_) => Err(AuthError::ProviderUnavailable("provider call timed out".to_string())),
        }
    }
}

/// Log internal detail for infrastructure failures; pass the error through.
fn observe(flow: &'static str, err: AuthError) -> AuthError {
    match &err {
        AuthError::ProviderUnavailable(detail)
        | AuthError::StoreUnavailable(detail)
        | AuthError::StoreConflict(detail)
        | AuthError::Internal(detail) => {
            tracing::warn!(flow, %detail, "authentication flow failed");
        }
        other => tracing::debug!(flow, error = %other, "authentication rejected"),
    }
    err
}
