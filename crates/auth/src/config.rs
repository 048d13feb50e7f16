//! Token configuration, validated once at startup and shared read-only.

use chrono::Duration;

use crate::account::AuthVariant;
use crate::ConfigError;

/// Secret + lifetime for one signing scope.
#[derive(Clone)]
pub struct SigningConfig {
    secret: Vec<u8>,
    ttl: Duration,
}

impl SigningConfig {
    /// `name` is the setting the secret came from, used in the error.
    pub fn new(name: &'static str, secret: impl Into<Vec<u8>>, ttl: Duration) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.iter().all(u8::is_ascii_whitespace) {
            return Err(ConfigError::EmptySecret(name));
        }
        if ttl <= Duration::zero() {
            return Err(ConfigError::Invalid {
                key: name,
                reason: "token lifetime must be positive".to_string(),
            });
        }
        Ok(Self { secret, ttl })
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl core::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Signing material for both scopes.
///
/// Local-credential sessions and provider-linked sessions are signed with
/// distinct secrets so a leak of one does not forge the other.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub local: SigningConfig,
    pub provider: SigningConfig,
}

impl TokenConfig {
    pub fn signing_for(&self, variant: AuthVariant) -> &SigningConfig {
        match variant {
            AuthVariant::Local => &self.local,
            AuthVariant::Steam | AuthVariant::Discord => &self.provider,
        }
    }
}
