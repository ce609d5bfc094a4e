//! Notification fan-out to every registered subscriber.
//!
//! A run takes one snapshot of the subscriber set and delivers the same
//! [`Notification`] to each webhook independently. Deliveries run
//! concurrently up to a configured limit, each bounded by a timeout. A failed
//! delivery is recorded in the [`NotificationOutcome`] and never stops the
//! others. The run as a whole fails only when the snapshot cannot be taken.

pub mod webhook;

use crate::core::error::ServiceError;
use crate::core::subscriber::{Subscriber, SubscriberId};
use crate::service::SubscriptionService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use webhook::WebhookDelivery;

/// Payload sent to each subscriber.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub event: String,
    pub triggered_at: DateTime<Utc>,
}

impl Notification {
    /// Signal that the rates were evaluated.
    pub fn evaluation() -> Self {
        Notification {
            event: "evaluation".to_string(),
            triggered_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("Endpoint answered with status {0}")]
    Status(u16),

    #[error("Transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

/// How a single notification reaches a single subscriber.
///
/// The engine calls `deliver` exactly once per subscriber and run, so any
/// retry policy belongs in the strategy.
#[async_trait]
pub trait DeliveryStrategy: Send + Sync {
    async fn deliver(
        &self,
        subscriber: &Subscriber,
        notification: &Notification,
    ) -> Result<(), DeliveryError>;
}

/// Aggregate result of one fan-out run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_ids: Vec<SubscriberId>,
}

impl NotificationOutcome {
    fn record(&mut self, id: SubscriberId, result: Result<(), DeliveryError>) {
        self.attempted += 1;
        match result {
            Ok(()) => self.succeeded += 1,
            Err(e) => {
                warn!(subscriber = %id, error = %e, "Webhook delivery failed");
                self.failed += 1;
                self.failed_ids.push(id);
            }
        }
    }
}

pub struct Notifier {
    strategy: Arc<dyn DeliveryStrategy>,
    timeout: Duration,
    concurrency: usize,
}

impl Notifier {
    pub fn new(strategy: Arc<dyn DeliveryStrategy>, timeout: Duration, concurrency: usize) -> Self {
        Self {
            strategy,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    /// Notifies every subscriber currently registered.
    ///
    /// The subscriber set is read once at the start. Registrations or removals
    /// that race with a run may or may not be seen by it.
    pub async fn notify_all(
        &self,
        subscriptions: &SubscriptionService,
        notification: &Notification,
    ) -> Result<NotificationOutcome, ServiceError> {
        let snapshot = subscriptions.list_all().await?;
        info!(
            subscribers = snapshot.len(),
            event = %notification.event,
            "Starting notification fan-out"
        );

        let outcome = self.deliver_all(snapshot, notification).await;
        info!(
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "Notification fan-out finished"
        );
        Ok(outcome)
    }

    /// Delivers to a fixed subscriber list; completion order is arbitrary.
    pub async fn deliver_all(
        &self,
        subscribers: Vec<Subscriber>,
        notification: &Notification,
    ) -> NotificationOutcome {
        let attempts = stream::iter(subscribers).map(|subscriber| async move {
            let result = self.deliver_one(&subscriber, notification).await;
            (subscriber.id, result)
        });

        attempts
            .buffer_unordered(self.concurrency)
            .fold(NotificationOutcome::default(), |mut outcome, (id, result)| async move {
                outcome.record(id, result);
                outcome
            })
            .await
    }

    async fn deliver_one(
        &self,
        subscriber: &Subscriber,
        notification: &Notification,
    ) -> Result<(), DeliveryError> {
        debug!(subscriber = %subscriber.id, url = %subscriber.webhook_url, "Delivering notification");
        match tokio::time::timeout(self.timeout, self.strategy.deliver(subscriber, notification)).await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(self.timeout)),
        }
    }
}
