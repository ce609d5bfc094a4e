//! HTTP surface.
//!
//! Bodies are parsed from raw bytes rather than through axum's `Json`
//! extractor, so a malformed body is always a 400 whatever its content type.

use crate::core::error::ServiceError;
use crate::core::rates::CurrencyRequest;
use crate::core::subscriber::{Subscriber, SubscriberCandidate, SubscriberId};
use crate::notify::{Notification, NotificationOutcome, Notifier};
use crate::service::{RateQueryService, SubscriptionService};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub subscriptions: SubscriptionService,
    pub rates: RateQueryService,
    pub notifier: Arc<Notifier>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Validation(_) | ServiceError::InvalidCurrency(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Store(_) | ServiceError::Source(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if self.is_client_error() {
            (status, self.to_string()).into_response()
        } else {
            error!(error = ?self, "Request failed");
            let reason = status.canonical_reason().unwrap_or("Internal Server Error");
            (status, reason).into_response()
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ServiceError> {
    serde_json::from_slice(body).map_err(|e| ServiceError::Validation(format!("Malformed JSON body: {e}")))
}

fn parse_id(raw: &str) -> Result<SubscriberId, ServiceError> {
    raw.parse()
        .map_err(|e: anyhow::Error| ServiceError::Validation(e.to_string()))
}

async fn not_implemented() -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

async fn missing_id() -> ServiceError {
    ServiceError::Validation("Subscriber id is required".to_string())
}

// ============================================================================
// Subscribers
// ============================================================================

/// POST /subscribers - Register a webhook, answers with the new id
async fn register_subscriber(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<String, ServiceError> {
    let candidate: SubscriberCandidate = parse_body(&body)?;
    let id = state.subscriptions.register(&candidate).await?;
    Ok(id.to_string())
}

/// GET /subscribers/:id
async fn get_subscriber(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Subscriber>, ServiceError> {
    let id = parse_id(&raw_id)?;
    Ok(Json(state.subscriptions.fetch(id).await?))
}

/// DELETE /subscribers/:id
async fn delete_subscriber(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    let id = parse_id(&raw_id)?;
    state.subscriptions.remove(id).await?;
    Ok(StatusCode::OK)
}

/// GET /subscribers/count
async fn count_subscribers(State(state): State<AppState>) -> Result<String, ServiceError> {
    Ok(state.subscriptions.count().await?.to_string())
}

// ============================================================================
// Rates
// ============================================================================

/// POST /latest - Latest rate, as plain text
async fn latest_rate(State(state): State<AppState>, body: Bytes) -> Result<String, ServiceError> {
    let request: CurrencyRequest = parse_body(&body)?;
    Ok(state.rates.latest(&request).await?.to_string())
}

/// POST /average - Seven day average rate, as plain text
async fn average_rate(State(state): State<AppState>, body: Bytes) -> Result<String, ServiceError> {
    let request: CurrencyRequest = parse_body(&body)?;
    Ok(state.rates.average(&request).await?.to_string())
}

// ============================================================================
// Notifications
// ============================================================================

/// GET /evaluate - Notify every subscriber now
async fn evaluate(State(state): State<AppState>) -> Result<Json<NotificationOutcome>, ServiceError> {
    let outcome = state
        .notifier
        .notify_all(&state.subscriptions, &Notification::evaluation())
        .await?;
    Ok(Json(outcome))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/subscribers",
            post(register_subscriber).fallback(not_implemented),
        )
        .route(
            "/subscribers/",
            get(missing_id).delete(missing_id).fallback(not_implemented),
        )
        .route(
            "/subscribers/count",
            get(count_subscribers)
                .delete(missing_id)
                .fallback(not_implemented),
        )
        .route(
            "/subscribers/:id",
            get(get_subscriber)
                .delete(delete_subscriber)
                .fallback(not_implemented),
        )
        .route("/latest", post(latest_rate).fallback(not_implemented))
        .route("/average", post(average_rate).fallback(not_implemented))
        .route("/evaluate", get(evaluate).fallback(not_implemented))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
