use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tabwarden_core::{AppResult, PluginId};
use tabwarden_domain::{CookieRefreshResult, StatusSnapshot, parse_expires_at};

use super::executor::RefreshExecutor;
use super::ports::{
    CredentialedFetcher, DiscoveryService, RandomSource, SharedStateStore, StoreEvent,
    StoreSubscription,
};
use super::scheduler::{RefreshScheduler, ScheduledTimer};
use super::{CookieRefreshConfig, EXPIRES_AT_KEY};

/// Application service wiring the refresh executor, the scheduler, and the
/// cross-tab synchronizer.
#[derive(Clone)]
pub struct CookieRefreshService {
    discovery: Arc<dyn DiscoveryService>,
    fetcher: Arc<dyn CredentialedFetcher>,
    store: Arc<dyn SharedStateStore>,
    random: Arc<dyn RandomSource>,
}

impl CookieRefreshService {
    /// Creates a new cookie refresh service.
    #[must_use]
    pub fn new(
        discovery: Arc<dyn DiscoveryService>,
        fetcher: Arc<dyn CredentialedFetcher>,
        store: Arc<dyn SharedStateStore>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            discovery,
            fetcher,
            store,
            random,
        }
    }

    /// Starts a coordination session for the given configuration.
    ///
    /// The session subscribes to the shared expiry record before its first
    /// refresh so no concurrent write is missed, then triggers that refresh
    /// from its own task. The returned handle is the only way to observe,
    /// retry, or stop the session; dropping it releases the armed timer and
    /// the subscription unconditionally.
    pub async fn start_session(
        &self,
        config: CookieRefreshConfig,
    ) -> AppResult<CookieRefreshSession> {
        let bucket = config.plugin_id().cookie_bucket_name();
        let subscription = self.store.subscribe(&bucket, EXPIRES_AT_KEY).await?;

        let executor = Arc::new(RefreshExecutor::new(
            self.discovery.clone(),
            self.fetcher.clone(),
            config.clone(),
        ));

        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let (retry_tx, retry_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let runtime = SessionRuntime {
            plugin_id: config.plugin_id().clone(),
            executor: executor.clone(),
            scheduler: RefreshScheduler::new(self.random.clone(), fired_tx),
            store: self.store.clone(),
            bucket,
            timer: None,
            subscription,
            subscription_closed: false,
            fired_rx,
            retry_rx,
        };

        info!(plugin_id = %config.plugin_id(), "starting cookie refresh session");
        let task = tokio::spawn(runtime.run(shutdown_rx));

        Ok(CookieRefreshSession {
            executor,
            retry_tx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

/// Handle for a live coordination session.
///
/// Sessions for the same plugin, whether in this process or another one
/// sharing the same store, coordinate through the shared expiry record
/// rather than refreshing independently. Two sessions refreshing inside
/// the same margin window are not reconciled (last write wins); the
/// refresh endpoint must treat concurrent refreshes as idempotent.
pub struct CookieRefreshSession {
    executor: Arc<RefreshExecutor>,
    retry_tx: mpsc::UnboundedSender<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CookieRefreshSession {
    /// Returns the current status projection.
    pub async fn status(&self) -> StatusSnapshot {
        self.executor.status().await
    }

    /// Subscribes to status snapshots published on every outcome change.
    #[must_use]
    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusSnapshot> {
        self.executor.subscribe_status()
    }

    /// Requests an immediate re-execution, regardless of current status.
    ///
    /// Each call triggers exactly one execution; calls made after the
    /// session stopped are ignored.
    pub fn retry(&self) {
        if self.retry_tx.send(()).is_err() {
            debug!("retry requested after session stopped");
        }
    }

    /// Stops the session, releasing the armed timer and the store
    /// subscription.
    pub async fn stop(mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                if !error.is_cancelled() {
                    warn!(error = %error, "cookie refresh session task ended abnormally");
                }
            }
        }
    }
}

impl Drop for CookieRefreshSession {
    fn drop(&mut self) {
        // A handle dropped without stop() must still release the timer and
        // the subscription.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct SessionRuntime {
    plugin_id: PluginId,
    executor: Arc<RefreshExecutor>,
    scheduler: RefreshScheduler,
    store: Arc<dyn SharedStateStore>,
    bucket: String,
    timer: Option<ScheduledTimer>,
    subscription: StoreSubscription,
    subscription_closed: bool,
    fired_rx: mpsc::UnboundedReceiver<()>,
    retry_rx: mpsc::UnboundedReceiver<()>,
}

impl SessionRuntime {
    async fn run(mut self, mut shutdown_rx: oneshot::Receiver<()>) {
        self.execute_once().await;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!(plugin_id = %self.plugin_id, "cookie refresh session shutting down");
                    break;
                }
                Some(()) = self.fired_rx.recv() => {
                    debug!(plugin_id = %self.plugin_id, "scheduled refresh timer fired");
                    self.execute_once().await;
                }
                Some(()) = self.retry_rx.recv() => {
                    debug!(plugin_id = %self.plugin_id, "manual retry requested");
                    self.execute_once().await;
                }
                event = self.subscription.recv(), if !self.subscription_closed => {
                    match event {
                        Some(StoreEvent { value: Some(value) }) => {
                            self.on_expiry_observed(&value);
                        }
                        Some(StoreEvent { value: None }) => {}
                        None => {
                            warn!(
                                plugin_id = %self.plugin_id,
                                "shared store subscription ended; remote expiry updates lost"
                            );
                            self.subscription_closed = true;
                        }
                    }
                }
            }
        }

        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    async fn execute_once(&mut self) {
        match self.executor.execute().await {
            Ok(result) => self.on_refresh_succeeded(&result).await,
            Err(error) => {
                warn!(plugin_id = %self.plugin_id, error = %error, "cookie refresh failed");
            }
        }
    }

    async fn on_refresh_succeeded(&mut self, result: &CookieRefreshResult) {
        let value = result.expires_at_rfc3339();

        if let Err(error) = self.store.set(&self.bucket, EXPIRES_AT_KEY, &value).await {
            warn!(
                plugin_id = %self.plugin_id,
                bucket = %self.bucket,
                error = %error,
                "failed writing expiry to shared store"
            );
        }

        // Rearm directly as well: correctness must not depend on the store
        // echoing the writer's own change.
        self.rearm(result.expires_at());
    }

    fn on_expiry_observed(&mut self, value: &str) {
        match parse_expires_at(value) {
            Ok(expires_at) => {
                debug!(
                    plugin_id = %self.plugin_id,
                    expires_at = %expires_at,
                    "observed shared expiry change"
                );
                self.rearm(expires_at);
            }
            Err(error) => {
                warn!(
                    plugin_id = %self.plugin_id,
                    error = %error,
                    "ignoring unparseable shared expiry value"
                );
            }
        }
    }

    fn rearm(&mut self, expires_at: DateTime<Utc>) {
        if let Some(previous) = self.timer.take() {
            previous.cancel();
        }

        self.timer = Some(self.scheduler.arm(expires_at));
    }
}
