//! Billing data providers.

pub mod azure;
mod traits;

pub use azure::Azure;
pub use traits::{BillingProvider, BillingProviderError};
