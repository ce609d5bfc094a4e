use crate::core::error::ServiceError;
use crate::core::store::SubscriberStore;
use crate::core::subscriber::{Subscriber, SubscriberCandidate, SubscriberId};
use crate::core::validation::validate_subscriber;
use std::sync::Arc;
use tracing::{debug, info};

/// Registration, lookup and removal of subscribers.
///
/// Holds no state of its own; every call goes to the store.
#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn SubscriberStore>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn SubscriberStore>) -> Self {
        Self { store }
    }

    pub async fn register(&self, candidate: &SubscriberCandidate) -> Result<SubscriberId, ServiceError> {
        let webhook_url = validate_subscriber(candidate)?;
        let id = self.store.add(&webhook_url).await?;
        info!(%id, webhook_url = %webhook_url, "Registered subscriber");
        Ok(id)
    }

    pub async fn fetch(&self, id: SubscriberId) -> Result<Subscriber, ServiceError> {
        debug!(%id, "Fetching subscriber");
        Ok(self.store.get(id).await?)
    }

    pub async fn remove(&self, id: SubscriberId) -> Result<(), ServiceError> {
        self.store.remove(id).await?;
        info!(%id, "Removed subscriber");
        Ok(())
    }

    /// Point-in-time snapshot of every subscriber, for fan-out.
    pub async fn list_all(&self) -> Result<Vec<Subscriber>, ServiceError> {
        Ok(self.store.get_all().await?)
    }

    pub async fn count(&self) -> Result<usize, ServiceError> {
        Ok(self.store.count().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::StoreError;
    use crate::store::memory::MemoryStore;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that fails every call and counts how often it was asked.
    #[derive(Default)]
    struct BrokenStore {
        calls: AtomicUsize,
    }

    impl BrokenStore {
        fn fail(&self) -> StoreError {
            self.calls.fetch_add(1, Ordering::SeqCst);
            StoreError::Backend(anyhow!("connection reset"))
        }
    }

    #[async_trait]
    impl SubscriberStore for BrokenStore {
        async fn add(&self, _webhook_url: &str) -> Result<SubscriberId, StoreError> {
            Err(self.fail())
        }
        async fn get(&self, _id: SubscriberId) -> Result<Subscriber, StoreError> {
            Err(self.fail())
        }
        async fn remove(&self, _id: SubscriberId) -> Result<(), StoreError> {
            Err(self.fail())
        }
        async fn get_all(&self) -> Result<Vec<Subscriber>, StoreError> {
            Err(self.fail())
        }
        async fn count(&self) -> Result<usize, StoreError> {
            Err(self.fail())
        }
    }

    fn candidate(url: &str) -> SubscriberCandidate {
        SubscriberCandidate {
            webhook_url: Some(url.to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_then_fetch_round_trip() {
        let service = SubscriptionService::new(Arc::new(MemoryStore::new()));

        let id = service.register(&candidate("https://example.com/hook")).await.unwrap();
        let sub = service.fetch(id).await.unwrap();

        assert_eq!(sub.id, id);
        assert_eq!(sub.webhook_url, "https://example.com/hook");
    }

    #[tokio::test]
    async fn test_remove_succeeds_exactly_once() {
        let service = SubscriptionService::new(Arc::new(MemoryStore::new()));
        let id = service.register(&candidate("https://example.com/hook")).await.unwrap();

        service.remove(id).await.unwrap();
        assert!(matches!(service.remove(id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.fetch(id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_candidate_never_reaches_store() {
        let store = Arc::new(BrokenStore::default());
        let service = SubscriptionService::new(store.clone());

        let err = service
            .register(&SubscriberCandidate { webhook_url: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service.register(&candidate("no scheme here")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_failures_are_server_errors() {
        let service = SubscriptionService::new(Arc::new(BrokenStore::default()));

        let err = service.register(&candidate("https://example.com/hook")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));
        assert!(matches!(service.list_all().await, Err(ServiceError::Store(_))));
        assert!(matches!(service.count().await, Err(ServiceError::Store(_))));
        assert!(matches!(
            service.fetch(SubscriberId::new(1)).await,
            Err(ServiceError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_list_all_and_count() {
        let service = SubscriptionService::new(Arc::new(MemoryStore::new()));
        service.register(&candidate("https://a.example.com/")).await.unwrap();
        service.register(&candidate("https://b.example.com/")).await.unwrap();

        assert_eq!(service.list_all().await.unwrap().len(), 2);
        assert_eq!(service.count().await.unwrap(), 2);
    }
}
