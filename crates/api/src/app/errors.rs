use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use authgate_auth::AuthError;

/// Map a facade error to a response.
///
/// Credential and token failures share generic bodies; infrastructure detail
/// stays in the log.
pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::InvalidCredentials => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid username or password",
        ),
        AuthError::TokenExpired
        | AuthError::TokenNotYetValid
        | AuthError::TokenMalformed(_)
        | AuthError::TokenSignatureInvalid
        | AuthError::SubjectNotFound => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid or expired session")
        }
        AuthError::UsernameTaken => {
            json_error(StatusCode::CONFLICT, "username_taken", "username is already taken")
        }
        AuthError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AuthError::UnknownExternalIdentity => json_error(
            StatusCode::NOT_FOUND,
            "unknown_identity",
            "provider has no such profile",
        ),
        AuthError::ProviderUnavailable(_) => json_error(
            StatusCode::BAD_GATEWAY,
            "provider_unavailable",
            "identity provider unavailable",
        ),
        AuthError::StoreConflict(_) | AuthError::StoreUnavailable(_) | AuthError::Internal(_) => {
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
