//! Azure Commerce and Resource Manager response models.

use serde::Deserialize;

use crate::usage::Meter;

/// OAuth2 client-credentials token response.
///
/// The v1 endpoint returns the numeric fields as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    /// Bearer token.
    pub access_token: String,
    /// Token type, normally "Bearer".
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<String>,
    /// Expiry as Unix seconds.
    #[serde(default)]
    pub expires_on: Option<String>,
    /// Resource the token is valid for.
    #[serde(default)]
    pub resource: Option<String>,
}

/// Rate card response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RateCardResponse {
    /// Meters matching the filter.
    #[serde(default)]
    pub meters: Vec<Meter>,
    /// Currency of the rates.
    #[serde(default)]
    pub currency: Option<String>,
    /// Locale of the names.
    #[serde(default)]
    pub locale: Option<String>,
    /// Whether rates include tax.
    #[serde(default)]
    pub is_tax_included: bool,
}

/// Paged list response used by Resource Manager and Usage Aggregates.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    /// Link to the next page, absent or empty on the last one.
    #[serde(default)]
    pub next_link: Option<String>,
}

impl<T> ListResponse<T> {
    /// The next page link, if there is one.
    #[must_use]
    pub fn next(&self) -> Option<&str> {
        self.next_link.as_deref().filter(|link| !link.is_empty())
    }
}

/// Error body returned by Resource Manager.
#[derive(Debug, Clone, Deserialize)]
pub struct AzureError {
    /// Error details.
    pub error: AzureErrorDetails,
}

/// Error details from Resource Manager.
#[derive(Debug, Clone, Deserialize)]
pub struct AzureErrorDetails {
    /// Error code.
    #[serde(default)]
    pub code: String,
    /// Error message.
    #[serde(default)]
    pub message: String,
}
