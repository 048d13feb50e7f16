use serde::{Deserialize, Serialize};

use authgate_auth::{ExternalProfile, SignedToken};
use authgate_core::AccountId;
use authgate_infra::{ProviderLogin, Registration};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<RegisterRequest> for Registration {
    fn from(body: RegisterRequest) -> Self {
        Registration {
            username: body.username,
            password: body.password,
            firstname: body.firstname,
            lastname: body.lastname,
            nickname: body.nickname,
            email: body.email.filter(|e| !e.trim().is_empty()),
        }
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct RegisteredResponse {
    pub id: AccountId,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: SignedToken,
}

#[derive(Debug, Serialize)]
pub struct ProviderLoginResponse {
    pub message: &'static str,
    pub token: SignedToken,
    pub profile: ExternalProfile,
}

impl From<ProviderLogin> for ProviderLoginResponse {
    fn from(login: ProviderLogin) -> Self {
        Self {
            message: "Login successful",
            token: login.token,
            profile: login.profile,
        }
    }
}
