use crate::core::store::{StoreError, SubscriberStore};
use crate::core::subscriber::{Subscriber, SubscriberId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

const PARTITION: &str = "subscribers";
const META_PARTITION: &str = "meta";
const NEXT_ID_KEY: &str = "next_id";

#[derive(Serialize, Deserialize)]
struct StoredSubscriber {
    webhook_url: String,
}

/// Subscriber store persisted in a fjall partition.
///
/// Keys are big-endian ids. The next id to assign lives in a separate meta
/// partition and is written in the same batch as each insert, so removing
/// the newest subscriber never frees its id for reuse.
pub struct DiskStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    meta: PartitionHandle,
    // Serializes writers; holds the next id to assign.
    next_id: Mutex<u64>,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create store directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open keyspace at {}", path.display()))?;
        let partition = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .context("Failed to open subscriber partition")?;
        let meta = keyspace
            .open_partition(META_PARTITION, PartitionCreateOptions::default())
            .context("Failed to open meta partition")?;

        let recorded = match meta.get(NEXT_ID_KEY)? {
            Some(value) => decode_key(&value)?,
            None => 1,
        };
        // Stores written without the counter resume after their highest key
        let after_last = match partition.last_key_value()? {
            Some((key, _)) => decode_key(&key)? + 1,
            None => 1,
        };
        let next_id = recorded.max(after_last);
        debug!(path = %path.display(), next_id, "Opened disk store");

        Ok(Self {
            keyspace,
            partition,
            meta,
            next_id: Mutex::new(next_id),
        })
    }

    fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist subscriber store")
    }
}

fn encode_key(id: SubscriberId) -> [u8; 8] {
    id.value().to_be_bytes()
}

fn decode_key(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| anyhow::anyhow!("Corrupt subscriber key of length {}", key.len()))?;
    Ok(u64::from_be_bytes(bytes))
}

fn decode_subscriber(key: &[u8], value: &[u8]) -> Result<Subscriber> {
    let id = SubscriberId::new(decode_key(key)?);
    let stored: StoredSubscriber = serde_json::from_slice(value)
        .with_context(|| format!("Failed to decode subscriber {id}"))?;
    Ok(Subscriber {
        id,
        webhook_url: stored.webhook_url,
    })
}

#[async_trait]
impl SubscriberStore for DiskStore {
    async fn add(&self, webhook_url: &str) -> Result<SubscriberId, StoreError> {
        let mut next_id = self.next_id.lock().await;
        let id = SubscriberId::new(*next_id);

        let value = serde_json::to_vec(&StoredSubscriber {
            webhook_url: webhook_url.to_string(),
        })
        .context("Failed to encode subscriber")?;

        let mut batch = self.keyspace.batch();
        batch.insert(&self.partition, encode_key(id).to_vec(), value);
        batch.insert(&self.meta, NEXT_ID_KEY.as_bytes(), (*next_id + 1).to_be_bytes().to_vec());
        batch
            .commit()
            .with_context(|| format!("Failed to insert subscriber {id}"))?;
        self.persist()?;

        *next_id += 1;
        debug!(%id, "Store ADD");
        Ok(id)
    }

    async fn get(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        let key = encode_key(id);
        let value = self
            .partition
            .get(key)
            .with_context(|| format!("Failed to read subscriber {id}"))?
            .ok_or(StoreError::NotFound(id))?;
        Ok(decode_subscriber(&key, &value)?)
    }

    async fn remove(&self, id: SubscriberId) -> Result<(), StoreError> {
        let _guard = self.next_id.lock().await;
        let key = encode_key(id);

        let exists = self
            .partition
            .contains_key(key)
            .with_context(|| format!("Failed to read subscriber {id}"))?;
        if !exists {
            return Err(StoreError::NotFound(id));
        }

        self.partition
            .remove(key.to_vec())
            .with_context(|| format!("Failed to remove subscriber {id}"))?;
        self.persist()?;
        debug!(%id, "Store REMOVE");
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Subscriber>, StoreError> {
        let mut subscribers = Vec::new();
        for item in self.partition.iter() {
            let (key, value) = item.context("Failed to scan subscribers")?;
            subscribers.push(decode_subscriber(&key, &value)?);
        }
        Ok(subscribers)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self
            .partition
            .len()
            .context("Failed to count subscribers")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_disk_store_add_get_remove() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();

        let id = store.add("https://example.com/hook").await.unwrap();
        let sub = store.get(id).await.unwrap();
        assert_eq!(sub.webhook_url, "https://example.com/hook");

        store.remove(id).await.unwrap();
        assert!(matches!(store.get(id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.remove(id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_disk_store_get_all_and_count() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();

        let a = store.add("https://example.com/a").await.unwrap();
        let b = store.add("https://example.com/b").await.unwrap();
        assert_ne!(a, b);

        assert_eq!(store.count().await.unwrap(), 2);
        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, a);
        assert_eq!(all[1].id, b);
    }

    #[tokio::test]
    async fn test_disk_store_survives_reopen() {
        let dir = tempdir().unwrap();

        let first = {
            let store = DiskStore::open(dir.path()).unwrap();
            store.add("https://example.com/a").await.unwrap()
        };

        let store = DiskStore::open(dir.path()).unwrap();
        assert_eq!(
            store.get(first).await.unwrap().webhook_url,
            "https://example.com/a"
        );

        // Ids keep increasing after a reopen
        let second = store.add("https://example.com/b").await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_disk_store_never_reuses_ids() {
        let dir = tempdir().unwrap();

        let removed = {
            let store = DiskStore::open(dir.path()).unwrap();
            store.add("https://example.com/a").await.unwrap();
            let newest = store.add("https://example.com/b").await.unwrap();
            store.remove(newest).await.unwrap();
            newest
        };

        let store = DiskStore::open(dir.path()).unwrap();
        let fresh = store.add("https://example.com/c").await.unwrap();
        assert_ne!(fresh, removed);
        assert!(fresh > removed);
        assert!(matches!(store.get(removed).await, Err(StoreError::NotFound(_))));
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
