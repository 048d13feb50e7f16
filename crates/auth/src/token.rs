//! Session token issuance and verification (compact JWS, HS256).
//!
//! Wire format: `base64url(header).base64url(claims).base64url(signature)`.
//! The header `kid` names the signing scope (`local` or `provider`) so the
//! verifier can pick the right secret before checking the signature.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::account::{Account, AuthVariant};
use crate::claims::{SessionClaims, validate_claims};
use crate::{TokenConfig, TokenError};

/// The only algorithm the gateway issues or accepts.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

const BEARER_PREFIX: &str = "Bearer ";

/// Which secret signs a token.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KeyScope {
    Local,
    Provider,
}

impl KeyScope {
    pub fn of(variant: AuthVariant) -> Self {
        match variant {
            AuthVariant::Local => KeyScope::Local,
            AuthVariant::Steam | AuthVariant::Discord => KeyScope::Provider,
        }
    }

    pub fn kid(self) -> &'static str {
        match self {
            KeyScope::Local => "local",
            KeyScope::Provider => "provider",
        }
    }

    fn from_kid(kid: &str) -> Option<Self> {
        match kid {
            "local" => Some(KeyScope::Local),
            "provider" => Some(KeyScope::Provider),
            _ => None,
        }
    }
}

/// An issued token. Opaque to callers; `Debug` never prints it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedToken(String);

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl core::fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SignedToken(<redacted>)")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Issuer
// ─────────────────────────────────────────────────────────────────────────────

/// Builds and signs session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    config: Arc<TokenConfig>,
    local: EncodingKey,
    provider: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: Arc<TokenConfig>) -> Self {
        let local = EncodingKey::from_secret(config.local.secret());
        let provider = EncodingKey::from_secret(config.provider.secret());
        Self {
            config,
            local,
            provider,
        }
    }

    /// Issue a token for `account`, valid from `now` for the variant's lifetime.
    pub fn issue(
        &self,
        account: &Account,
        variant: AuthVariant,
        now: DateTime<Utc>,
    ) -> Result<SignedToken, TokenError> {
        let ttl = self.config.signing_for(variant).ttl();
        let claims = SessionClaims::for_account(account, variant, now, ttl);
        self.sign(&claims)
    }

    /// Sign pre-built claims with the key for their `auth_type`.
    pub fn sign(&self, claims: &SessionClaims) -> Result<SignedToken, TokenError> {
        let scope = KeyScope::of(claims.auth_type);
        let mut header = Header::new(ALGORITHM);
        header.kid = Some(scope.kid().to_string());

        let key = match scope {
            KeyScope::Local => &self.local,
            KeyScope::Provider => &self.provider,
        };

        jsonwebtoken::encode(&header, claims, key)
            .map(SignedToken)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Verifier
// ─────────────────────────────────────────────────────────────────────────────

/// Validates signature, algorithm and time window; yields typed claims.
#[derive(Clone)]
pub struct TokenVerifier {
    local: DecodingKey,
    provider: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Time checks run in `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "nbf".to_string()]);

        Self {
            local: DecodingKey::from_secret(config.local.secret()),
            provider: DecodingKey::from_secret(config.provider.secret()),
            validation,
        }
    }

    /// Verify a raw `Authorization` value or bare token at time `now`.
    pub fn verify(&self, raw: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let token = strip_bearer(raw)?;
        let scope = self.inspect_header(token)?;

        let key = match scope {
            KeyScope::Local => &self.local,
            KeyScope::Provider => &self.provider,
        };

        let claims = jsonwebtoken::decode::<SessionClaims>(token, key, &self.validation)
            .map_err(map_jwt_error)?
            .claims;

        if KeyScope::of(claims.auth_type) != scope {
            return Err(TokenError::MalformedClaims(format!(
                "auth_type '{}' not valid for key '{}'",
                claims.auth_type,
                scope.kid()
            )));
        }

        validate_claims(&claims, now)?;
        Ok(claims)
    }

    /// Check structure and algorithm before any key is touched.
    fn inspect_header(&self, token: &str) -> Result<KeyScope, TokenError> {
        if token.split('.').count() != 3 {
            return Err(TokenError::Malformed("expected three segments".to_string()));
        }

        // An `alg` outside jsonwebtoken's known set (`none` included) fails to parse.
        let header = jsonwebtoken::decode_header(token).map_err(|e| match e.kind() {
            ErrorKind::Json(_) | ErrorKind::InvalidAlgorithmName => {
                TokenError::AlgorithmRejected(e.to_string())
            }
            _ => TokenError::Malformed(e.to_string()),
        })?;

        if header.alg != ALGORITHM {
            return Err(TokenError::AlgorithmRejected(format!("{:?}", header.alg)));
        }

        header
            .kid
            .as_deref()
            .and_then(KeyScope::from_kid)
            .ok_or_else(|| TokenError::Malformed("unknown key id".to_string()))
    }
}

/// Strip an optional `Bearer ` scheme prefix and surrounding whitespace.
pub fn strip_bearer(raw: &str) -> Result<&str, TokenError> {
    let raw = raw.trim();
    let token = raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw).trim();
    if token.is_empty() {
        return Err(TokenError::Missing);
    }
    Ok(token)
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::AlgorithmRejected(err.to_string())
        }
        ErrorKind::Json(e) => TokenError::MalformedClaims(e.to_string()),
        ErrorKind::MissingRequiredClaim(claim) => {
            TokenError::MalformedClaims(format!("missing claim '{claim}'"))
        }
        _ => TokenError::Malformed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use serde_json::json;

    use authgate_core::{AccountId, ExternalId};

    use super::*;
    use crate::account::{AccountKind, AccountStatus, AvatarRefs, Provider};
    use crate::password::PasswordHash;
    use crate::{Role, SigningConfig};

    const LOCAL_SECRET: &str = "local-test-secret";
    const PROVIDER_SECRET: &str = "provider-test-secret";

    fn config() -> Arc<TokenConfig> {
        Arc::new(TokenConfig {
            local: SigningConfig::new("TOKEN_SECRET_USER", LOCAL_SECRET, Duration::days(7)).unwrap(),
            provider: SigningConfig::new("JWT_SECRET", PROVIDER_SECRET, Duration::hours(24)).unwrap(),
        })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn alice() -> Account {
        Account {
            id: AccountId::new(42),
            username: "alice".into(),
            firstname: "Alice".into(),
            lastname: "Liddell".into(),
            nickname: "al".into(),
            email: Some("alice@example.com".into()),
            role: Role::default(),
            status: AccountStatus::Active,
            kind: AccountKind::Local {
                password_hash: PasswordHash::from_stored("$2b$04$stored-hash-value"),
            },
            created_at: now(),
        }
    }

    fn steam_user() -> Account {
        Account {
            id: AccountId::new(7),
            username: "gaben".into(),
            firstname: String::new(),
            lastname: String::new(),
            nickname: String::new(),
            email: None,
            role: Role::default(),
            status: AccountStatus::Active,
            kind: AccountKind::Linked {
                provider: Provider::Steam,
                external_id: ExternalId::steam("76561197960287930").unwrap(),
                avatar: AvatarRefs::default(),
            },
            created_at: now(),
        }
    }

    fn pair() -> (TokenIssuer, TokenVerifier) {
        let cfg = config();
        (TokenIssuer::new(cfg.clone()), TokenVerifier::new(&cfg))
    }

    fn encode_raw(header: &Header, claims: &serde_json::Value, secret: &str) -> String {
        jsonwebtoken::encode(header, claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn local_header() -> Header {
        let mut h = Header::new(Algorithm::HS256);
        h.kid = Some("local".into());
        h
    }

    fn raw_claims(sub: serde_json::Value) -> serde_json::Value {
        let t = now().timestamp();
        json!({
            "sub": sub,
            "auth_type": "local",
            "data": { "id": sub, "username": "alice" },
            "iat": t, "nbf": t, "exp": t + 3600,
        })
    }

    #[test]
    fn issue_then_verify_round_trips_subject() {
        let (issuer, verifier) = pair();
        let token = issuer.issue(&alice(), AuthVariant::Local, now()).unwrap();
        let claims = verifier.verify(token.as_str(), now()).unwrap();

        assert_eq!(claims.sub, AccountId::new(42));
        assert_eq!(claims.auth_type, AuthVariant::Local);
        assert_eq!(claims.data.username, "alice");
        assert_eq!(claims.exp - claims.nbf, Duration::days(7).num_seconds());
    }

    #[test]
    fn provider_tokens_are_shorter_lived_and_carry_avatar() {
        let (issuer, verifier) = pair();
        let token = issuer.issue(&steam_user(), AuthVariant::Steam, now()).unwrap();
        let claims = verifier.verify(token.as_str(), now()).unwrap();

        assert_eq!(claims.exp - claims.iat, Duration::hours(24).num_seconds());
        assert!(claims.data.avatar.is_some());
    }

    #[test]
    fn token_never_embeds_password_hash() {
        let (issuer, _) = pair();
        let token = issuer.issue(&alice(), AuthVariant::Local, now()).unwrap();
        let payload = token.as_str().split('.').nth(1).unwrap();
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        assert!(!decoded.contains("stored-hash-value"));
    }

    #[test]
    fn bearer_prefix_is_optional() {
        let (issuer, verifier) = pair();
        let token = issuer.issue(&alice(), AuthVariant::Local, now()).unwrap();
        let header = format!("Bearer {}", token.as_str());
        assert!(verifier.verify(&header, now()).is_ok());
        assert_eq!(verifier.verify("Bearer   ", now()), Err(TokenError::Missing));
    }

    #[test]
    fn expired_and_premature_tokens_are_rejected() {
        let (issuer, verifier) = pair();
        let token = issuer.issue(&alice(), AuthVariant::Local, now()).unwrap();

        let later = now() + Duration::days(7);
        assert_eq!(verifier.verify(token.as_str(), later), Err(TokenError::Expired));

        let earlier = now() - Duration::seconds(1);
        assert_eq!(verifier.verify(token.as_str(), earlier), Err(TokenError::NotYetValid));
    }

    #[test]
    fn none_algorithm_fails_closed() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT","kid":"local"}"#);
        let claims = URL_SAFE_NO_PAD.encode(raw_claims(json!(42)).to_string());
        let token = format!("{header}.{claims}.");

        let (_, verifier) = pair();
        assert!(matches!(
            verifier.verify(&token, now()),
            Err(TokenError::AlgorithmRejected(reason)) if reason.contains("none")
        ));
    }

    #[test]
    fn header_without_algorithm_is_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"typ":"JWT","kid":"local"}"#);
        let claims = URL_SAFE_NO_PAD.encode(raw_claims(json!(42)).to_string());
        let token = format!("{header}.{claims}.c2ln");

        let (_, verifier) = pair();
        assert!(matches!(verifier.verify(&token, now()), Err(TokenError::AlgorithmRejected(_))));
    }

    #[test]
    fn undecodable_header_is_malformed() {
        let (_, verifier) = pair();
        assert!(matches!(verifier.verify("!!!.e30.c2ln", now()), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn other_hmac_algorithm_is_rejected_even_with_right_secret() {
        let mut header = Header::new(Algorithm::HS512);
        header.kid = Some("local".into());
        let token = encode_raw(&header, &raw_claims(json!(42)), LOCAL_SECRET);

        let (_, verifier) = pair();
        assert!(matches!(verifier.verify(&token, now()), Err(TokenError::AlgorithmRejected(_))));
    }

    #[test]
    fn token_signed_with_other_scope_secret_fails() {
        // Claims say local, kid says local, but signed with the provider secret.
        let token = encode_raw(&local_header(), &raw_claims(json!(42)), PROVIDER_SECRET);
        let (_, verifier) = pair();
        assert_eq!(verifier.verify(&token, now()), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn auth_type_must_match_key_scope() {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("provider".into());
        let token = encode_raw(&header, &raw_claims(json!(42)), PROVIDER_SECRET);

        let (_, verifier) = pair();
        assert!(matches!(verifier.verify(&token, now()), Err(TokenError::MalformedClaims(_))));
    }

    #[test]
    fn missing_or_unknown_kid_is_malformed() {
        let header = Header::new(Algorithm::HS256);
        let token = encode_raw(&header, &raw_claims(json!(42)), LOCAL_SECRET);
        let (_, verifier) = pair();
        assert!(matches!(verifier.verify(&token, now()), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn float_subject_is_accepted_as_integer() {
        let token = encode_raw(&local_header(), &raw_claims(json!(42.0)), LOCAL_SECRET);
        let (_, verifier) = pair();
        let claims = verifier.verify(&token, now()).unwrap();
        assert_eq!(claims.sub, AccountId::new(42));
    }

    #[test]
    fn missing_data_bag_is_malformed_claims() {
        let mut claims = raw_claims(json!(42));
        claims.as_object_mut().unwrap().remove("data");
        let token = encode_raw(&local_header(), &claims, LOCAL_SECRET);

        let (_, verifier) = pair();
        assert!(matches!(verifier.verify(&token, now()), Err(TokenError::MalformedClaims(_))));
    }

    #[test]
    fn string_subject_is_malformed_claims() {
        let token = encode_raw(&local_header(), &raw_claims(json!("42")), LOCAL_SECRET);
        let (_, verifier) = pair();
        assert!(matches!(verifier.verify(&token, now()), Err(TokenError::MalformedClaims(_))));
    }

    #[test]
    fn garbage_is_malformed() {
        let (_, verifier) = pair();
        assert!(matches!(verifier.verify("abc", now()), Err(TokenError::Malformed(_))));
        assert!(matches!(verifier.verify("a.b.c.d", now()), Err(TokenError::Malformed(_))));
    }

    fn tamper_signature(token: &str, index: usize, mask: u8) -> String {
        let (signed, sig) = token.rsplit_once('.').unwrap();
        let mut bytes = URL_SAFE_NO_PAD.decode(sig).unwrap();
        let i = index % bytes.len();
        bytes[i] ^= mask;
        format!("{signed}.{}", URL_SAFE_NO_PAD.encode(bytes))
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: flipping any bits of any signature byte fails verification.
        #[test]
        fn tampered_signature_never_verifies(index in 0usize..32, mask in 1u8..=255) {
            let (issuer, verifier) = pair();
            let token = issuer.issue(&alice(), AuthVariant::Local, now()).unwrap();
            let tampered = tamper_signature(token.as_str(), index, mask);
            prop_assert_eq!(verifier.verify(&tampered, now()), Err(TokenError::SignatureInvalid));
        }

        /// Property: once past `exp`, a correctly signed token is always `Expired`.
        #[test]
        fn past_expiry_is_always_expired(ttl_secs in 1i64..1_000_000, overshoot in 0i64..10_000_000) {
            let cfg = Arc::new(TokenConfig {
                local: SigningConfig::new("TOKEN_SECRET_USER", LOCAL_SECRET, Duration::seconds(ttl_secs)).unwrap(),
                provider: SigningConfig::new("JWT_SECRET", PROVIDER_SECRET, Duration::hours(1)).unwrap(),
            });
            let issuer = TokenIssuer::new(cfg.clone());
            let verifier = TokenVerifier::new(&cfg);

            let token = issuer.issue(&alice(), AuthVariant::Local, now()).unwrap();
            let at = now() + Duration::seconds(ttl_secs + overshoot);
            prop_assert_eq!(verifier.verify(token.as_str(), at), Err(TokenError::Expired));
        }

        /// Property: any subject survives issue → verify.
        #[test]
        fn subject_round_trips(id in 1i64..i64::MAX / 2) {
            let (issuer, verifier) = pair();
            let mut account = alice();
            account.id = AccountId::new(id);
            let token = issuer.issue(&account, AuthVariant::Local, now()).unwrap();
            prop_assert_eq!(verifier.verify(token.as_str(), now()).unwrap().sub, AccountId::new(id));
        }
    }
}
