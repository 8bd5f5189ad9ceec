//! Redis-backed shared store for cross-process session coordination.

use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use tokio::sync::mpsc;
use tracing::warn;

use tabwarden_application::{SharedStateStore, StoreEvent, StoreSubscription};
use tabwarden_core::{AppError, AppResult};

const CHANGE_FEED_CAPACITY: usize = 32;

/// Redis implementation of the shared state store.
///
/// Values are persisted with `SET` under `{bucket}:{key}` and every write
/// is published on a pub/sub channel of the same name, so sessions in
/// other processes observe the change, as does the writer itself.
#[derive(Clone)]
pub struct RedisSharedStateStore {
    client: redis::Client,
}

impl RedisSharedStateStore {
    /// Creates one store adapter.
    #[must_use]
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn name_for(bucket: &str, key: &str) -> String {
        format!("{bucket}:{key}")
    }
}

#[async_trait]
impl SharedStateStore for RedisSharedStateStore {
    async fn set(&self, bucket: &str, key: &str, value: &str) -> AppResult<()> {
        let name = Self::name_for(bucket, key);

        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Storage(format!("failed to connect to redis: {error}")))?;

        connection
            .set::<_, _, ()>(name.as_str(), value)
            .await
            .map_err(|error| {
                AppError::Storage(format!("failed to persist shared value: {error}"))
            })?;

        connection
            .publish::<_, _, ()>(name.as_str(), value)
            .await
            .map_err(|error| {
                AppError::Storage(format!("failed to publish shared value change: {error}"))
            })?;

        Ok(())
    }

    async fn subscribe(&self, bucket: &str, key: &str) -> AppResult<StoreSubscription> {
        let name = Self::name_for(bucket, key);

        let mut pubsub = self.client.get_async_pubsub().await.map_err(|error| {
            AppError::Storage(format!("failed to open redis subscription: {error}"))
        })?;

        pubsub.subscribe(name.as_str()).await.map_err(|error| {
            AppError::Storage(format!(
                "failed to subscribe to shared value changes: {error}"
            ))
        })?;

        let (events_tx, events_rx) = mpsc::channel(CHANGE_FEED_CAPACITY);

        let forwarder = tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();

            while let Some(message) = messages.next().await {
                let value = match message.get_payload::<String>() {
                    Ok(payload) => Some(payload),
                    Err(error) => {
                        warn!(error = %error, "ignoring undecodable shared value payload");
                        None
                    }
                };

                if events_tx.send(StoreEvent { value }).await.is_err() {
                    break;
                }
            }
        });

        Ok(StoreSubscription::with_forwarder(events_rx, forwarder))
    }
}
