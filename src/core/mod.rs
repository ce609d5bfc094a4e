//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod error;
pub mod log;
pub mod rates;
pub mod store;
pub mod subscriber;
pub mod validation;

// Re-export main types for cleaner imports
pub use error::ServiceError;
pub use rates::{CurrencyPair, CurrencyRequest, RateError, RateSource};
pub use store::{StoreError, SubscriberStore};
pub use subscriber::{Subscriber, SubscriberCandidate, SubscriberId};
