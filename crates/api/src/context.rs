use authgate_auth::{AuthVariant, SessionClaims};
use authgate_core::AccountId;

/// Verified session for a request.
///
/// Inserted by the session middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    claims: SessionClaims,
}

impl SessionContext {
    pub fn new(claims: SessionClaims) -> Self {
        Self { claims }
    }

    pub fn account_id(&self) -> AccountId {
        self.claims.sub
    }

    pub fn auth_type(&self) -> AuthVariant {
        self.claims.auth_type
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }
}
