//! Request-level orchestration over the validation layer and collaborators.

pub mod rates;
pub mod subscription;

pub use rates::{AVERAGE_WINDOW_DAYS, RateQueryService};
pub use subscription::SubscriptionService;
