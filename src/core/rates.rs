//! Currency rate abstractions

use async_trait::async_trait;
use serde::Deserialize;

/// Rate query body. Fields stay optional until validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyRequest {
    #[serde(default)]
    pub base_currency: Option<String>,
    #[serde(default)]
    pub target_currency: Option<String>,
}

/// A validated base/target pair, ready for a `RateSource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyPair {
    pub base: String,
    pub target: String,
}

/// Outcome of a rate source call other than a rate.
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    /// The source does not know one of the currency codes.
    #[error("Unrecognized currency: {0}")]
    InvalidCurrency(String),

    /// The source is unreachable or failed internally.
    #[error("Rate source failure: {0}")]
    Source(#[from] anyhow::Error),
}

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn latest(&self, base: &str, target: &str) -> Result<f64, RateError>;

    async fn average(&self, base: &str, target: &str, days: u32) -> Result<f64, RateError>;
}
