use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::with_retry;
use crate::core::cache::Cache;
use crate::core::rates::{RateError, RateSource};

const RETRIES: usize = 2;
const RETRY_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartItem {
    meta: ChartMeta,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

/// Checks a currency code and puts it in the form Yahoo expects.
fn normalize_code(code: &str) -> Result<String, RateError> {
    let code = code.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(RateError::InvalidCurrency(code.to_string()))
    }
}

fn pair_symbol(base: &str, target: &str) -> Result<String, RateError> {
    Ok(format!(
        "{}{}=X",
        normalize_code(base)?,
        normalize_code(target)?
    ))
}

fn mean_close(item: &ChartItem) -> Option<f64> {
    let closes: Vec<f64> = item
        .indicators
        .as_ref()
        .and_then(|inds| inds.quote.first())
        .and_then(|q| q.close.as_ref())?
        .iter()
        .flatten()
        .copied()
        .collect();

    if closes.is_empty() {
        None
    } else {
        Some(closes.iter().sum::<f64>() / closes.len() as f64)
    }
}

/// Exchange rates from the Yahoo Finance chart API.
pub struct YahooRateSource {
    base_url: String,
    client: reqwest::Client,
    cache: Arc<Cache<String, f64>>,
}

impl YahooRateSource {
    pub fn new(base_url: &str, cache: Arc<Cache<String, f64>>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ratehook/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(YahooRateSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            cache,
        })
    }

    async fn fetch_chart(&self, symbol: &str, query: &str) -> Result<ChartItem, RateError> {
        let url = format!("{}/v8/finance/chart/{}{}", self.base_url, symbol, query);
        debug!("Requesting currency rate from {}", url);

        let response = with_retry(|| self.client.get(&url).send(), RETRIES, RETRY_DELAY)
            .await
            .map_err(|e| anyhow!("Request error: {} for currency pair: {}", e, symbol))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RateError::InvalidCurrency(symbol.to_string()));
        }
        if !status.is_success() {
            return Err(anyhow!("HTTP error: {} for currency pair: {}", status, symbol).into());
        }

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response for {symbol}"))?;
        let data: YahooChartResponse = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON response for {symbol}"))?;

        match data.chart.result.and_then(|items| items.into_iter().next()) {
            Some(item) => Ok(item),
            None => match data.chart.error {
                Some(err) => {
                    debug!(
                        code = %err.code,
                        description = ?err.description,
                        "Yahoo rejected currency pair {}", symbol
                    );
                    Err(RateError::InvalidCurrency(symbol.to_string()))
                }
                None => Err(anyhow!("No rate data found for currency pair: {}", symbol).into()),
            },
        }
    }
}

#[async_trait]
impl RateSource for YahooRateSource {
    #[instrument(name = "YahooLatestRate", skip(self))]
    async fn latest(&self, base: &str, target: &str) -> Result<f64, RateError> {
        let symbol = pair_symbol(base, target)?;
        let key = format!("latest:{symbol}");
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let item = self.fetch_chart(&symbol, "").await?;
        let rate = item.meta.regular_market_price;

        self.cache.put(key, rate).await;
        Ok(rate)
    }

    #[instrument(name = "YahooAverageRate", skip(self))]
    async fn average(&self, base: &str, target: &str, days: u32) -> Result<f64, RateError> {
        if days == 0 {
            return Err(anyhow!("Average window must be at least one day").into());
        }
        let symbol = pair_symbol(base, target)?;
        let key = format!("average{days}:{symbol}");
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let query = format!("?interval=1d&range={days}d");
        let item = self.fetch_chart(&symbol, &query).await?;

        let rate = mean_close(&item)
            .ok_or_else(|| anyhow!("No closing rates for {} over {} days", symbol, days))?;

        self.cache.put(key, rate).await;
        Ok(rate)
    }
}
