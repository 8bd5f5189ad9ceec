//! Cookie refresh coordination.
//!
//! A coordination session keeps a short-lived authentication cookie fresh:
//! it runs one refresh on start, persists each new expiry to a shared store
//! bucket scoped per plugin, observes that bucket for changes made by any
//! session of the same origin, and reschedules the next refresh a
//! randomized 1–4 minutes before the latest known expiry so concurrent
//! sessions do not all refresh at once.

mod executor;
mod ports;
mod scheduler;
mod session;


use tabwarden_core::{AppError, AppResult, PluginId};

pub use executor::RefreshExecutor;
pub use ports::{
    CredentialedFetcher, DiscoveryService, FetchedResponse, RandomSource, SharedStateStore,
    StoreEvent, StoreSubscription,
};
pub use scheduler::{RefreshScheduler, ScheduledTimer};
pub use session::{CookieRefreshService, CookieRefreshSession};

/// Key under which the shared expiry record is stored.
pub const EXPIRES_AT_KEY: &str = "expiresAt";

/// Default endpoint path serving the refreshed cookie.
pub const DEFAULT_COOKIE_PATH: &str = "/cookie";

/// Configuration captured by a coordination session.
#[derive(Debug, Clone)]
pub struct CookieRefreshConfig {
    plugin_id: PluginId,
    path: String,
}

impl CookieRefreshConfig {
    /// Creates a session configuration; `path` defaults to `/cookie`.
    pub fn new(plugin_id: PluginId, path: Option<String>) -> AppResult<Self> {
        let path = path.unwrap_or_else(|| DEFAULT_COOKIE_PATH.to_owned());

        if !path.starts_with('/') {
            return Err(AppError::Validation(format!(
                "cookie endpoint path '{path}' must start with '/'"
            )));
        }

        Ok(Self { plugin_id, path })
    }

    /// Returns the plugin whose cookie is kept fresh.
    #[must_use]
    pub fn plugin_id(&self) -> &PluginId {
        &self.plugin_id
    }

    /// Returns the endpoint path appended to the plugin base URL.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }
}
