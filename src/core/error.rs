//! Caller-facing error taxonomy shared by the services.

use crate::core::rates::RateError;
use crate::core::store::StoreError;
use crate::core::subscriber::SubscriberId;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed input: unparseable body, missing field, bad URL or id.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Currency code rejected by the rate source.
    #[error("Unrecognized currency: {0}")]
    InvalidCurrency(String),

    #[error("Subscriber {0} not found")]
    NotFound(SubscriberId),

    #[error("Subscriber store failure")]
    Store(#[source] anyhow::Error),

    #[error("Rate source failure")]
    Source(#[source] anyhow::Error),
}

impl ServiceError {
    /// True for errors caused by the caller's input rather than a collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::Validation(_) | ServiceError::InvalidCurrency(_) | ServiceError::NotFound(_)
        )
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            StoreError::Backend(e) => ServiceError::Store(e),
        }
    }
}

impl From<RateError> for ServiceError {
    fn from(err: RateError) -> Self {
        match err {
            RateError::InvalidCurrency(code) => ServiceError::InvalidCurrency(code),
            RateError::Source(e) => ServiceError::Source(e),
        }
    }
}
