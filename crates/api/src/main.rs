use std::sync::Arc;

use anyhow::Context;

use authgate_infra::{
    AccountStore, AuthConfig, DiscordOAuth, InMemoryAccountStore, PostgresAccountStore,
    SessionService, SteamWebApi,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    authgate_observability::init();

    let config = AuthConfig::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
    })?;

    let store: Arc<dyn AccountStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresAccountStore::connect(url)
                .await
                .context("failed to connect to postgres")?;
            store.migrate().await.context("failed to apply schema")?;
            tracing::info!("using postgres account store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; accounts are kept in memory");
            Arc::new(InMemoryAccountStore::new())
        }
    };

    let mut session = SessionService::new(store, config.session_settings())?;

    match &config.steam_api_key {
        Some(key) => {
            session = session.with_steam(Arc::new(SteamWebApi::new(key.clone(), config.request_timeout)?));
        }
        None => tracing::warn!("STEAM_API_KEY not set; steam login disabled"),
    }
    match &config.discord {
        Some(discord) => {
            session = session.with_discord(Arc::new(DiscordOAuth::new(
                discord.clone(),
                config.request_timeout,
            )?));
        }
        None => tracing::warn!("discord settings not set; discord login disabled"),
    }

    let app = authgate_api::app::build_app(Arc::new(session));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
