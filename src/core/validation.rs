//! Input validation for subscriber registrations and rate queries.
//!
//! Checks here are purely syntactic. Whether a webhook endpoint is reachable
//! or a currency code is known is decided later by the collaborators.

use crate::core::error::ServiceError;
use crate::core::rates::{CurrencyPair, CurrencyRequest};
use crate::core::subscriber::SubscriberCandidate;

/// Validates a registration candidate and returns the webhook URL to persist.
pub fn validate_subscriber(candidate: &SubscriberCandidate) -> Result<String, ServiceError> {
    let raw = candidate
        .webhook_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ServiceError::Validation("webhookURL is required".to_string()))?;

    // Url::parse only succeeds for absolute URLs, relative references fail
    // with RelativeUrlWithoutBase.
    url::Url::parse(raw)
        .map_err(|e| ServiceError::Validation(format!("Invalid webhookURL '{raw}': {e}")))?;

    Ok(raw.to_string())
}

/// Validates a rate query. Both currency codes must be present and non-blank.
pub fn validate_currency_request(request: &CurrencyRequest) -> Result<CurrencyPair, ServiceError> {
    let base = required_code(request.base_currency.as_deref(), "baseCurrency")?;
    let target = required_code(request.target_currency.as_deref(), "targetCurrency")?;
    Ok(CurrencyPair { base, target })
}

fn required_code(value: Option<&str>, field: &str) -> Result<String, ServiceError> {
    value
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServiceError::Validation(format!("{field} is required")))
}
