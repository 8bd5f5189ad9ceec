use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use url::Url;

use tabwarden_core::{AppError, AppResult};
use tabwarden_domain::{CookieRefreshResult, RefreshOutcome, StatusSnapshot};

use super::CookieRefreshConfig;
use super::ports::{CredentialedFetcher, DiscoveryService};

const STATUS_FEED_CAPACITY: usize = 16;

/// Performs the network round trip that renews the cookie and tracks the
/// latest outcome.
pub struct RefreshExecutor {
    discovery: Arc<dyn DiscoveryService>,
    fetcher: Arc<dyn CredentialedFetcher>,
    config: CookieRefreshConfig,
    epoch: AtomicU64,
    outcome: RwLock<RefreshOutcome>,
    status_feed: broadcast::Sender<StatusSnapshot>,
}

impl RefreshExecutor {
    /// Creates an executor for the configured plugin endpoint.
    #[must_use]
    pub fn new(
        discovery: Arc<dyn DiscoveryService>,
        fetcher: Arc<dyn CredentialedFetcher>,
        config: CookieRefreshConfig,
    ) -> Self {
        let (status_feed, _) = broadcast::channel(STATUS_FEED_CAPACITY);

        Self {
            discovery,
            fetcher,
            config,
            epoch: AtomicU64::new(0),
            outcome: RwLock::new(RefreshOutcome::NotStarted),
            status_feed,
        }
    }

    /// Returns the current outcome.
    pub async fn outcome(&self) -> RefreshOutcome {
        self.outcome.read().await.clone()
    }

    /// Returns the current status projection.
    pub async fn status(&self) -> StatusSnapshot {
        StatusSnapshot::project(&*self.outcome.read().await)
    }

    /// Subscribes to status snapshots published on every outcome change.
    #[must_use]
    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusSnapshot> {
        self.status_feed.subscribe()
    }

    /// Executes one refresh round trip.
    ///
    /// Safe to re-invoke while a previous call is outstanding: the latest
    /// call wins outcome tracking, and a completion belonging to a
    /// superseded call is discarded.
    pub async fn execute(&self) -> AppResult<CookieRefreshResult> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.transition(|outcome| RefreshOutcome::Pending {
            last_success: outcome.last_known_good().cloned(),
        })
        .await;

        let run = self.run().await;

        if self.epoch.load(Ordering::SeqCst) == epoch {
            match &run {
                Ok(result) => {
                    let result = result.clone();
                    self.transition(move |_| RefreshOutcome::Succeeded { result })
                        .await;
                }
                Err(error) => {
                    let error = error.clone();
                    self.transition(move |outcome| RefreshOutcome::Failed {
                        error,
                        last_success: outcome.last_known_good().cloned(),
                    })
                    .await;
                }
            }
        } else {
            debug!(
                plugin_id = %self.config.plugin_id(),
                "discarding outcome of superseded refresh execution"
            );
        }

        run
    }

    async fn run(&self) -> AppResult<CookieRefreshResult> {
        let base_url = self.discovery.base_url(self.config.plugin_id()).await?;
        let url = self.endpoint_url(&base_url)?;

        debug!(plugin_id = %self.config.plugin_id(), url = %url, "refreshing auth cookie");
        let response = self.fetcher.get(&url).await?;

        if !(200..300).contains(&response.status) {
            return Err(AppError::HttpResponse {
                status: response.status,
                body: response.body,
            });
        }

        serde_json::from_str::<CookieRefreshResult>(&response.body).map_err(|error| {
            AppError::MalformedResponse(format!(
                "refresh response body does not match wire contract: {error}"
            ))
        })
    }

    fn endpoint_url(&self, base_url: &Url) -> AppResult<Url> {
        let joined = format!(
            "{}{}",
            base_url.as_str().trim_end_matches('/'),
            self.config.path()
        );

        Url::parse(&joined).map_err(|error| {
            AppError::Discovery(format!("invalid cookie endpoint url '{joined}': {error}"))
        })
    }

    async fn transition(&self, next: impl FnOnce(&RefreshOutcome) -> RefreshOutcome) {
        let mut outcome = self.outcome.write().await;
        *outcome = next(&outcome);
        let _ = self.status_feed.send(StatusSnapshot::project(&outcome));
    }
}
