use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use authgate_auth::{AvatarRefs, ExternalProfile, Provider, SigningConfig, TokenConfig};
use authgate_core::ExternalId;
use authgate_infra::{
    AccountStore, InMemoryAccountStore, OAuthProvider, ProviderError, ProviderToken,
    SessionService, SessionSettings, SteamProfiles,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

const LOCAL_SECRET: &str = "local-test-secret";
const PROVIDER_SECRET: &str = "provider-test-secret";
const GABEN: &str = "76561197960287930";

struct FakeSteam;

#[async_trait]
impl SteamProfiles for FakeSteam {
    async fn fetch_profile(&self, steam_id: &ExternalId) -> Result<ExternalProfile, ProviderError> {
        if steam_id.as_str() != GABEN {
            return Err(ProviderError::NotFound(steam_id.to_string()));
        }
        Ok(ExternalProfile {
            provider: Provider::Steam,
            external_id: steam_id.clone(),
            display_name: "Rabscuttle".into(),
            avatar: AvatarRefs {
                small: "https://avatars.example/s.jpg".into(),
                medium: "https://avatars.example/m.jpg".into(),
                full: "https://avatars.example/f.jpg".into(),
            },
        })
    }
}

struct FakeDiscord;

#[async_trait]
impl OAuthProvider for FakeDiscord {
    fn authorize_url(&self) -> String {
        "https://discord.example/oauth2/authorize?client_id=123".into()
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        match code {
            "good-code" => Ok(ProviderToken {
                access_token: "access".into(),
                token_type: "Bearer".into(),
            }),
            _ => Err(ProviderError::Unavailable("invalid_grant".into())),
        }
    }

    async fn fetch_user(&self, _: &ProviderToken) -> Result<ExternalProfile, ProviderError> {
        Ok(ExternalProfile {
            provider: Provider::Discord,
            external_id: ExternalId::new("80351110224678912").unwrap(),
            display_name: "Nelly".into(),
            avatar: AvatarRefs::default(),
        })
    }
}

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let tokens = TokenConfig {
            local: SigningConfig::new("TOKEN_SECRET_USER", LOCAL_SECRET, ChronoDuration::days(7))
                .unwrap(),
            provider: SigningConfig::new("JWT_SECRET", PROVIDER_SECRET, ChronoDuration::days(1))
                .unwrap(),
        };
        let store: Arc<dyn AccountStore> = Arc::new(InMemoryAccountStore::new());
        let session = SessionService::new(
            store,
            SessionSettings {
                tokens: Arc::new(tokens),
                bcrypt_cost: 4,
                request_timeout: Duration::from_secs(5),
            },
        )
        .unwrap()
        .with_steam(Arc::new(FakeSteam))
        .with_discord(Arc::new(FakeDiscord));

        // Same router as prod, bound to an ephemeral port.
        let app = authgate_api::app::build_app(Arc::new(session));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn mint(secret: &str, alg: Algorithm, kid: &str, sub: i64, iat: i64, exp: i64) -> String {
    let mut header = Header::new(alg);
    header.kid = Some(kid.to_string());
    let claims = json!({
        "sub": sub,
        "auth_type": "local",
        "data": { "id": sub, "username": "alice" },
        "iat": iat,
        "nbf": iat,
        "exp": exp,
    });
    jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("failed to encode jwt")
}

async fn register_alice(srv: &TestServer, client: &reqwest::Client) -> i64 {
    let res = client
        .post(srv.url("/register"))
        .json(&json!({
            "username": "alice",
            "password": "wonderland",
            "firstname": "Alice",
            "email": "alice@example.com",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

async fn login(srv: &TestServer, client: &reqwest::Client, password: &str) -> reqwest::Response {
    client
        .post(srv.url("/login"))
        .json(&json!({ "username": "alice", "password": password }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = client().get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_requires_a_token() {
    let srv = TestServer::spawn().await;
    let res = client().get(srv.url("/session")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn alice_registers_logs_in_and_reads_her_session() {
    let srv = TestServer::spawn().await;
    let client = client();
    let id = register_alice(&srv, &client).await;

    let res = login(&srv, &client, "wonderland").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url("/session"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let detail: serde_json::Value = res.json().await.unwrap();
    assert_eq!(detail["id"].as_i64().unwrap(), id);
    assert_eq!(detail["username"], "alice");
    assert_eq!(detail["auth_type"], "local");
    assert_eq!(detail["email"], "alice@example.com");
    assert!(detail.get("password_hash").is_none());
}

#[tokio::test]
async fn session_accepts_token_without_bearer_scheme() {
    let srv = TestServer::spawn().await;
    let client = client();
    let id = register_alice(&srv, &client).await;

    let body: serde_json::Value = login(&srv, &client, "wonderland").await.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url("/session"))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let detail: serde_json::Value = res.json().await.unwrap();
    assert_eq!(detail["id"].as_i64().unwrap(), id);

    let res = client
        .get(srv.url("/session"))
        .header("Authorization", "Bearer ")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_username_is_conflict() {
    let srv = TestServer::spawn().await;
    let client = client();
    register_alice(&srv, &client).await;

    let res = client
        .post(srv.url("/register"))
        .json(&json!({ "username": "alice", "password": "again" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let srv = TestServer::spawn().await;
    let client = client();
    register_alice(&srv, &client).await;

    let wrong = login(&srv, &client, "looking-glass").await;
    let unknown = client
        .post(srv.url("/login"))
        .json(&json!({ "username": "mallory", "password": "wonderland" }))
        .send()
        .await
        .unwrap();

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let wrong: serde_json::Value = wrong.json().await.unwrap();
    let unknown: serde_json::Value = unknown.json().await.unwrap();
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn expired_and_foreign_tokens_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = client();
    let id = register_alice(&srv, &client).await;
    let now = Utc::now().timestamp();

    let expired = mint(LOCAL_SECRET, Algorithm::HS256, "local", id, now - 7200, now - 3600);
    let wrong_key = mint("someone-else", Algorithm::HS256, "local", id, now, now + 3600);
    let wrong_alg = mint(LOCAL_SECRET, Algorithm::HS512, "local", id, now, now + 3600);
    let valid = mint(LOCAL_SECRET, Algorithm::HS256, "local", id, now, now + 3600);

    for token in [expired, wrong_key, wrong_alg] {
        let res = client
            .get(srv.url("/session"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    let res = client
        .get(srv.url("/session"))
        .bearer_auth(&valid)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn steam_login_creates_account_once() {
    let srv = TestServer::spawn().await;
    let client = client();

    let mut ids = Vec::new();
    for _ in 0..2 {
        let res = client
            .get(srv.url(&format!("/login/steam/{GABEN}")))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["profile"]["display_name"], "Rabscuttle");

        let token = body["token"].as_str().unwrap().to_string();
        let detail: serde_json::Value = client
            .get(srv.url("/session"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(detail["auth_type"], "steam");
        assert_eq!(detail["points"], 0);
        ids.push(detail["id"].as_i64().unwrap());
    }

    assert_eq!(ids[0], ids[1]);
}

#[tokio::test]
async fn steam_login_errors() {
    let srv = TestServer::spawn().await;
    let client = client();

    let res = client.get(srv.url("/login/steam/not-a-number")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.get(srv.url("/login/steam/42")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn discord_redirect_and_callback() {
    let srv = TestServer::spawn().await;
    let client = client();

    let res = client.get(srv.url("/login/discord")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        res.headers()["location"],
        "https://discord.example/oauth2/authorize?client_id=123"
    );

    let res = client
        .get(srv.url("/login/discord/callback?code=good-code"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["profile"]["provider"], "discord");

    let res = client
        .get(srv.url("/login/discord/callback?code=stale"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    let res = client.get(srv.url("/login/discord/callback")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
