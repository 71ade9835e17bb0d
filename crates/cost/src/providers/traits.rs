//! Billing provider trait and errors.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::usage::{Group, Meter, UsageRecord};

/// Errors that can occur while talking to a billing provider.
#[derive(Error, Debug)]
pub enum BillingProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Authentication error (token request rejected or token refused).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Invalid configuration (e.g. an endpoint that is not a URL).
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A source of rate cards, resource groups and usage readings.
///
/// Calls are made one at a time by the extractor; implementations do not
/// need to handle concurrent use.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Provider name (e.g. "azure").
    fn name(&self) -> &'static str;

    /// Fetch the rate card, keyed by meter ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn get_meters(&self) -> Result<HashMap<String, Meter>, BillingProviderError>;

    /// Fetch resource groups, keyed by group name.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn get_groups(&self) -> Result<HashMap<String, Group>, BillingProviderError>;

    /// Fetch all usage records reported in `[start, end)`, following
    /// pagination, with instance data already parsed.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    async fn get_readings(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UsageRecord>, BillingProviderError>;
}
