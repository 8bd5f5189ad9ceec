//! Tabwarden headless cookie refresh agent.
//!
//! Keeps one plugin's auth cookie fresh from outside a browser: starts a
//! coordination session, logs every status transition, and stops the
//! session cleanly on ctrl-c. With a redis URL configured, multiple agent
//! processes coordinate through the shared expiry record instead of
//! refreshing independently.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;

use tabwarden_application::{
    CookieRefreshConfig, CookieRefreshService, CookieRefreshSession, SharedStateStore,
};
use tabwarden_core::{AppError, AppResult, PluginId};
use tabwarden_domain::{CookieStatus, StatusSnapshot};
use tabwarden_infrastructure::{
    HttpCredentialedFetcher, InMemorySharedStateStore, OsRandomSource, RedisSharedStateStore,
    UrlPatternDiscovery,
};

use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct AgentConfig {
    plugin_id: String,
    cookie_path: Option<String>,
    discovery_url_pattern: String,
    redis_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AgentConfig::load()?;
    let session = start_session(&config).await?;
    let mut status_feed = session.subscribe_status();

    info!(
        plugin_id = %config.plugin_id,
        discovery_url_pattern = %config.discovery_url_pattern,
        shared_store = if config.redis_url.is_some() { "redis" } else { "in-memory" },
        "tabwarden-agent started"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
            snapshot = status_feed.recv() => {
                match snapshot {
                    Ok(snapshot) => log_status(&snapshot),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "status feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    session.stop().await;
    info!("tabwarden-agent stopped");
    Ok(())
}

async fn start_session(config: &AgentConfig) -> AppResult<CookieRefreshSession> {
    let discovery = Arc::new(UrlPatternDiscovery::new(
        config.discovery_url_pattern.as_str(),
    )?);
    let fetcher = Arc::new(HttpCredentialedFetcher::new()?);
    let store = build_store(config)?;
    let random = Arc::new(OsRandomSource);

    let service = CookieRefreshService::new(discovery, fetcher, store, random);
    let session_config = CookieRefreshConfig::new(
        PluginId::new(config.plugin_id.as_str())?,
        config.cookie_path.clone(),
    )?;

    service.start_session(session_config).await
}

fn build_store(config: &AgentConfig) -> AppResult<Arc<dyn SharedStateStore>> {
    match config.redis_url.as_deref() {
        Some(redis_url) => {
            let client = redis::Client::open(redis_url).map_err(|error| {
                AppError::Storage(format!("invalid redis url: {error}"))
            })?;
            Ok(Arc::new(RedisSharedStateStore::new(client)))
        }
        None => Ok(Arc::new(InMemorySharedStateStore::new())),
    }
}

fn log_status(snapshot: &StatusSnapshot) {
    match snapshot.status {
        CookieStatus::Loading => info!(status = snapshot.status.as_str(), "refreshing"),
        CookieStatus::Success => {
            let expires_at = snapshot
                .result
                .as_ref()
                .map(|result| result.expires_at_rfc3339())
                .unwrap_or_default();
            info!(status = snapshot.status.as_str(), expires_at = %expires_at, "cookie refreshed");
        }
        CookieStatus::Error => {
            let error = snapshot
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            warn!(status = snapshot.status.as_str(), error = %error, "cookie refresh failing");
        }
    }
}

impl AgentConfig {
    fn load() -> AppResult<Self> {
        let plugin_id = required_env("TABWARDEN_PLUGIN_ID")?;
        let discovery_url_pattern = required_env("TABWARDEN_DISCOVERY_URL_PATTERN")?;
        let cookie_path = optional_env("TABWARDEN_COOKIE_PATH");
        let redis_url = optional_env("TABWARDEN_REDIS_URL");

        Ok(Self {
            plugin_id,
            cookie_path,
            discovery_url_pattern,
            redis_url,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
