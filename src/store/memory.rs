use crate::core::store::{StoreError, SubscriberStore};
use crate::core::subscriber::{Subscriber, SubscriberId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

struct Inner {
    next_id: u64,
    subscribers: BTreeMap<SubscriberId, Subscriber>,
}

/// In-memory subscriber store. Contents are lost when the process exits.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 1,
                subscribers: BTreeMap::new(),
            })),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriberStore for MemoryStore {
    async fn add(&self, webhook_url: &str) -> Result<SubscriberId, StoreError> {
        let mut inner = self.inner.lock().await;
        let id = SubscriberId::new(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.insert(
            id,
            Subscriber {
                id,
                webhook_url: webhook_url.to_string(),
            },
        );
        debug!(%id, "Store ADD");
        Ok(id)
    }

    async fn get(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .subscribers
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn remove(&self, id: SubscriberId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.subscribers.remove(&id) {
            Some(_) => {
                debug!(%id, "Store REMOVE");
                Ok(())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn get_all(&self) -> Result<Vec<Subscriber>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.subscribers.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.lock().await.subscribers.len())
    }
}
