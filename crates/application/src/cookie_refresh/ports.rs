use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use tabwarden_core::{AppResult, PluginId};

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Resolves a logical plugin id to the concrete origin serving it.
#[async_trait]
pub trait DiscoveryService: Send + Sync {
    /// Returns the base URL of the plugin's backend.
    async fn base_url(&self, plugin_id: &PluginId) -> AppResult<Url>;
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// Raw HTTP response surface consumed by the executor.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

/// Transport port issuing credentialed GET requests.
///
/// Implementations must send ambient session credentials with the request,
/// equivalent to `credentials: include` in browser fetch terms.
#[async_trait]
pub trait CredentialedFetcher: Send + Sync {
    /// Issues a GET request and returns status plus body.
    async fn get(&self, url: &Url) -> AppResult<FetchedResponse>;
}

// ---------------------------------------------------------------------------
// Shared store
// ---------------------------------------------------------------------------

/// Change notification delivered by a store subscription.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    /// New value under the observed key; `None` when the key is absent.
    pub value: Option<String>,
}

/// Cross-session key/value store with change notification.
///
/// Buckets are namespaced per caller. A write under a key notifies every
/// subscriber of that key, including the writer, across all sessions and
/// processes sharing the same store.
#[async_trait]
pub trait SharedStateStore: Send + Sync {
    /// Writes `value` under `bucket`/`key`, notifying subscribers.
    async fn set(&self, bucket: &str, key: &str, value: &str) -> AppResult<()>;

    /// Subscribes to changes of `bucket`/`key`.
    async fn subscribe(&self, bucket: &str, key: &str) -> AppResult<StoreSubscription>;
}

/// Live registration with a store's change feed.
///
/// Dropping the subscription releases the registration and stops any
/// forwarder task owned by it.
pub struct StoreSubscription {
    events: mpsc::Receiver<StoreEvent>,
    forwarder: Option<JoinHandle<()>>,
}

impl StoreSubscription {
    /// Creates a subscription draining the given event channel.
    #[must_use]
    pub fn new(events: mpsc::Receiver<StoreEvent>) -> Self {
        Self {
            events,
            forwarder: None,
        }
    }

    /// Creates a subscription owning a forwarder task, aborted on drop.
    #[must_use]
    pub fn with_forwarder(events: mpsc::Receiver<StoreEvent>, forwarder: JoinHandle<()>) -> Self {
        Self {
            events,
            forwarder: Some(forwarder),
        }
    }

    /// Receives the next change event; `None` once the feed ends.
    pub async fn recv(&mut self) -> Option<StoreEvent> {
        self.events.recv().await
    }
}

impl Drop for StoreSubscription {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Randomness
// ---------------------------------------------------------------------------

/// Uniform random source for refresh margin jitter.
///
/// Load spreading only, not a security property; pluggable so tests stay
/// deterministic.
pub trait RandomSource: Send + Sync {
    /// Returns a value uniformly distributed in `[0, 1)`.
    fn uniform(&self) -> f64;
}
