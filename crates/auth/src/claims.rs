use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use authgate_core::AccountId;

use crate::account::{Account, AccountStatus, AuthVariant, AvatarRefs};
use crate::{Role, TokenError};

/// Display attributes embedded in a token (`data` claim).
///
/// A snapshot taken at issue time. Never carries credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    pub id: AccountId,
    pub username: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<AvatarRefs>,
}

impl DisplaySnapshot {
    pub fn of(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            firstname: account.firstname.clone(),
            lastname: account.lastname.clone(),
            nickname: account.nickname.clone(),
            role: account.role.clone(),
            status: account.status,
            avatar: account.avatar().cloned(),
        }
    }
}

/// Session token claims (wire names follow JWT registered claims).
///
/// Decoded fresh from the signed token on every verification; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: internal account identifier.
    pub sub: AccountId,

    /// How the session was established.
    pub auth_type: AuthVariant,

    /// Display snapshot.
    pub data: DisplaySnapshot,

    /// Issued-at (unix seconds).
    pub iat: i64,

    /// Not-before (unix seconds).
    pub nbf: i64,

    /// Expiry (unix seconds).
    pub exp: i64,
}

impl SessionClaims {
    pub fn for_account(
        account: &Account,
        auth_type: AuthVariant,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let issued = now.timestamp();
        Self {
            sub: account.id,
            auth_type,
            data: DisplaySnapshot::of(account),
            iat: issued,
            nbf: issued,
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// Deterministically validate the claims' time window against `now`.
///
/// Signature and algorithm checks happen before this in the verifier.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.exp <= claims.nbf {
        return Err(TokenError::MalformedClaims(
            "invalid time window (exp <= nbf)".to_string(),
        ));
    }
    if claims.sub != claims.data.id {
        return Err(TokenError::MalformedClaims("sub does not match data.id".to_string()));
    }
    let now = now.timestamp();
    if now >= claims.exp {
        return Err(TokenError::Expired);
    }
    if now < claims.nbf {
        return Err(TokenError::NotYetValid);
    }
    Ok(())
}
