//! Subscriber persistence abstractions

use crate::core::subscriber::{Subscriber, SubscriberId};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Subscriber {0} not found")]
    NotFound(SubscriberId),

    #[error("Store failure: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Durable mapping from subscriber id to subscriber record.
///
/// Implementations own their synchronization; every call is one logically
/// atomic operation.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Persists a new subscriber and returns the id assigned to it.
    async fn add(&self, webhook_url: &str) -> Result<SubscriberId, StoreError>;

    async fn get(&self, id: SubscriberId) -> Result<Subscriber, StoreError>;

    async fn remove(&self, id: SubscriberId) -> Result<(), StoreError>;

    async fn get_all(&self) -> Result<Vec<Subscriber>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}
