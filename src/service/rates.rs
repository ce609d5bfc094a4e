use crate::core::error::ServiceError;
use crate::core::rates::{CurrencyRequest, RateSource};
use crate::core::validation::validate_currency_request;
use std::sync::Arc;
use tracing::debug;

/// Window used by the public average-rate entry point.
pub const AVERAGE_WINDOW_DAYS: u32 = 7;

/// Validated rate lookups against a `RateSource`.
#[derive(Clone)]
pub struct RateQueryService {
    source: Arc<dyn RateSource>,
}

impl RateQueryService {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self { source }
    }

    pub async fn latest(&self, request: &CurrencyRequest) -> Result<f64, ServiceError> {
        let pair = validate_currency_request(request)?;
        debug!(base = %pair.base, target = %pair.target, "Latest rate query");
        Ok(self.source.latest(&pair.base, &pair.target).await?)
    }

    pub async fn average(&self, request: &CurrencyRequest) -> Result<f64, ServiceError> {
        self.average_over(request, AVERAGE_WINDOW_DAYS).await
    }

    pub async fn average_over(&self, request: &CurrencyRequest, days: u32) -> Result<f64, ServiceError> {
        let pair = validate_currency_request(request)?;
        if days == 0 {
            return Err(ServiceError::Validation(
                "Average window must be at least one day".to_string(),
            ));
        }
        debug!(base = %pair.base, target = %pair.target, days, "Average rate query");
        Ok(self.source.average(&pair.base, &pair.target, days).await?)
    }
}
