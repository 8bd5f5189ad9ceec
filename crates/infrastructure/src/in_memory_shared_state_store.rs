use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::warn;

use tabwarden_application::{SharedStateStore, StoreEvent, StoreSubscription};
use tabwarden_core::AppResult;

const CHANGE_FEED_CAPACITY: usize = 32;

struct Slot {
    value: Option<String>,
    changes: broadcast::Sender<Option<String>>,
}

impl Slot {
    fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            value: None,
            changes,
        }
    }
}

/// Process-local shared store with broadcast change notification.
///
/// Every subscriber of a key sees every write under it, including the
/// writer's own; this is the store backing tests and single-process
/// multi-session setups.
#[derive(Default)]
pub struct InMemorySharedStateStore {
    slots: RwLock<HashMap<(String, String), Slot>>,
}

impl InMemorySharedStateStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the current value under `bucket`/`key`, if any.
    pub async fn get(&self, bucket: &str, key: &str) -> Option<String> {
        let slots = self.slots.read().await;
        slots
            .get(&(bucket.to_owned(), key.to_owned()))
            .and_then(|slot| slot.value.clone())
    }
}

#[async_trait]
impl SharedStateStore for InMemorySharedStateStore {
    async fn set(&self, bucket: &str, key: &str, value: &str) -> AppResult<()> {
        let mut slots = self.slots.write().await;
        let slot = slots
            .entry((bucket.to_owned(), key.to_owned()))
            .or_insert_with(Slot::new);

        slot.value = Some(value.to_owned());
        let _ = slot.changes.send(Some(value.to_owned()));
        Ok(())
    }

    async fn subscribe(&self, bucket: &str, key: &str) -> AppResult<StoreSubscription> {
        let mut slots = self.slots.write().await;
        let slot = slots
            .entry((bucket.to_owned(), key.to_owned()))
            .or_insert_with(Slot::new);

        let mut changes = slot.changes.subscribe();
        let (events_tx, events_rx) = mpsc::channel(CHANGE_FEED_CAPACITY);

        let forwarder = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(value) => {
                        if events_tx.send(StoreEvent { value }).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "shared store subscriber lagged behind change feed");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(StoreSubscription::with_forwarder(events_rx, forwarder))
    }
}
