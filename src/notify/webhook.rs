use super::{DeliveryError, DeliveryStrategy, Notification};
use crate::core::subscriber::Subscriber;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Delivers notifications as a JSON `POST` to the subscriber's webhook URL.
///
/// Any 2xx answer counts as delivered. Redirects are not followed.
#[derive(Clone)]
pub struct WebhookDelivery {
    client: Client,
}

impl WebhookDelivery {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ratehook/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DeliveryStrategy for WebhookDelivery {
    async fn deliver(
        &self,
        subscriber: &Subscriber,
        notification: &Notification,
    ) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&subscriber.webhook_url)
            .json(notification)
            .send()
            .await
            .map_err(|e| anyhow!("Request to {} failed: {}", subscriber.webhook_url, e))?;

        let status = response.status();
        debug!(subscriber = %subscriber.id, %status, "Webhook answered");
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::subscriber::SubscriberId;
    use crate::notify::Notifier;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn subscriber(id: u64, url: String) -> Subscriber {
        Subscriber {
            id: SubscriberId::new(id),
            webhook_url: url,
        }
    }

    async fn hook_server(status: u16, delay: Duration) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(status).set_delay(delay))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_posts_json_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(serde_json::json!({ "event": "evaluation" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let delivery = WebhookDelivery::new(Duration::from_secs(2)).unwrap();
        delivery
            .deliver(
                &subscriber(1, format!("{}/hook", server.uri())),
                &Notification::evaluation(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status_is_failure() {
        let server = hook_server(500, Duration::ZERO).await;
        let delivery = WebhookDelivery::new(Duration::from_secs(2)).unwrap();

        let err = delivery
            .deliver(
                &subscriber(1, format!("{}/hook", server.uri())),
                &Notification::evaluation(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Status(500)));
    }

    #[tokio::test]
    async fn test_redirect_is_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(307).insert_header("location", "/elsewhere"))
            .mount(&server)
            .await;

        let delivery = WebhookDelivery::new(Duration::from_secs(2)).unwrap();
        let err = delivery
            .deliver(
                &subscriber(1, format!("{}/hook", server.uri())),
                &Notification::evaluation(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Status(307)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_failure() {
        let delivery = WebhookDelivery::new(Duration::from_secs(2)).unwrap();
        let err = delivery
            .deliver(
                &subscriber(1, "http://127.0.0.1:9/hook".to_string()),
                &Notification::evaluation(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
    }

    #[test_log::test(tokio::test)]
    async fn test_fan_out_over_real_endpoints() {
        let slow = hook_server(200, Duration::from_secs(5)).await;
        let ok_a = hook_server(200, Duration::ZERO).await;
        let ok_b = hook_server(202, Duration::ZERO).await;

        let timeout = Duration::from_millis(300);
        let notifier = Notifier::new(
            Arc::new(WebhookDelivery::new(timeout).unwrap()),
            timeout,
            4,
        );

        let subscribers = vec![
            subscriber(1, format!("{}/hook", slow.uri())),
            subscriber(2, format!("{}/hook", ok_a.uri())),
            subscriber(3, format!("{}/hook", ok_b.uri())),
        ];
        let outcome = notifier
            .deliver_all(subscribers, &Notification::evaluation())
            .await;

        assert_eq!(outcome.attempted, 3);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.failed_ids, vec![SubscriberId::new(1)]);
    }
}
