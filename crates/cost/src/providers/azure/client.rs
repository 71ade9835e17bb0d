//! Azure billing API client implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::models::{AccessToken, AzureError, ListResponse, RateCardResponse};
use crate::config::Config;
use crate::providers::traits::{BillingProvider, BillingProviderError};
use crate::usage::{populate_instance_data, Group, Meter, UsageRecord};

/// Connect timeout for every request.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Resource the management token is requested for.
const MANAGEMENT_RESOURCE: &str = "https://management.azure.com/";

/// API version for the rate card.
const RATE_CARD_API_VERSION: &str = "2016-08-31-preview";

/// API version for usage aggregates.
const USAGE_API_VERSION: &str = "2015-06-01-preview";

/// API version for resource groups.
const GROUPS_API_VERSION: &str = "2019-05-10";

/// Azure billing client.
///
/// Holds a bearer token obtained at construction; the token is not refreshed,
/// so a run has to finish within its lifetime.
#[derive(Debug, Clone)]
pub struct Azure {
    /// HTTP client.
    client: Client,
    /// Resource Manager base URL.
    management_url: String,
    /// Subscription ID.
    subscription_id: String,
    /// Rate card `$filter` expression.
    rate_card_filter: String,
    /// Access token.
    access_token: String,
}

impl Azure {
    /// Log in with the configured service principal and build a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created or the token
    /// request fails.
    pub async fn connect(config: &Config) -> Result<Self, BillingProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(concat!("cloud-cost/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(BillingProviderError::Http)?;

        let token = Self::login(&client, config).await?;

        Ok(Self {
            client,
            management_url: config.management_url.trim_end_matches('/').to_string(),
            subscription_id: config.subscription_id.clone(),
            rate_card_filter: Self::rate_card_filter(config),
            access_token: token.access_token,
        })
    }

    /// Request a token with the client-credentials grant.
    #[instrument(skip_all, fields(tenant = %config.tenant_id))]
    async fn login(client: &Client, config: &Config) -> Result<AccessToken, BillingProviderError> {
        let url = format!(
            "{}/{}/oauth2/token",
            config.login_url.trim_end_matches('/'),
            config.tenant_id
        );
        debug!(url = %url, "Requesting access token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("resource", MANAGEMENT_RESOURCE),
        ];

        let response = client.post(&url).form(&form).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if status != StatusCode::OK {
            return Err(BillingProviderError::Auth(text));
        }

        let token: AccessToken = serde_json::from_str(&text)?;
        if token.access_token.is_empty() {
            return Err(BillingProviderError::Auth(
                "token response did not contain an access token".to_string(),
            ));
        }

        info!(expires_in = ?token.expires_in, "Obtained access token");
        Ok(token)
    }

    /// Build the rate card OData filter.
    fn rate_card_filter(config: &Config) -> String {
        format!(
            "OfferDurableId eq '{}' and Currency eq '{}' and Locale eq '{}' and RegionInfo eq '{}'",
            config.offer_durable_id, config.currency, config.locale, config.region_info
        )
    }

    /// Subscription-scoped URL with query parameters.
    fn subscription_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, BillingProviderError> {
        let raw = format!(
            "{}/subscriptions/{}{}",
            self.management_url, self.subscription_id, path
        );
        Url::parse_with_params(&raw, params)
            .map_err(|e| BillingProviderError::Config(format!("invalid URL {raw}: {e}")))
    }

    /// Make an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, BillingProviderError> {
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Handle API response.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BillingProviderError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, "Failed to parse response");
                BillingProviderError::Serialization(e)
            })
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(BillingProviderError::Auth(Self::error_message(text)))
        } else {
            Err(BillingProviderError::Api {
                status: status.as_u16(),
                message: Self::error_message(text),
            })
        }
    }

    /// Prefer the structured error message when the body has one.
    fn error_message(text: String) -> String {
        match serde_json::from_str::<AzureError>(&text) {
            Ok(err) if !err.error.message.is_empty() => {
                format!("{}: {}", err.error.code, err.error.message)
            }
            _ => text,
        }
    }
}

#[async_trait]
impl BillingProvider for Azure {
    fn name(&self) -> &'static str {
        "azure"
    }

    #[instrument(skip(self), fields(provider = "azure"))]
    async fn get_meters(&self) -> Result<HashMap<String, Meter>, BillingProviderError> {
        let url = self.subscription_url(
            "/providers/Microsoft.Commerce/RateCard",
            &[
                ("api-version", RATE_CARD_API_VERSION),
                ("$filter", self.rate_card_filter.as_str()),
            ],
        )?;

        let card: RateCardResponse = self.get(url.as_str()).await?;
        info!(
            meters = card.meters.len(),
            currency = ?card.currency,
            tax_included = card.is_tax_included,
            "Loaded rate card"
        );

        Ok(card
            .meters
            .into_iter()
            .map(|meter| (meter.meter_id.clone(), meter))
            .collect())
    }

    #[instrument(skip(self), fields(provider = "azure"))]
    async fn get_groups(&self) -> Result<HashMap<String, Group>, BillingProviderError> {
        let url = self.subscription_url("/resourcegroups", &[("api-version", GROUPS_API_VERSION)])?;

        let page: ListResponse<Group> = self.get(url.as_str()).await?;
        if let Some(next) = page.next() {
            debug!(next_link = %next, "Ignoring further resource group pages");
        }
        info!(groups = page.value.len(), "Loaded resource groups");

        Ok(page
            .value
            .into_iter()
            .map(|group| (group.name.clone(), group))
            .collect())
    }

    #[instrument(skip(self), fields(provider = "azure"))]
    async fn get_readings(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UsageRecord>, BillingProviderError> {
        let start_text = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let end_text = end.to_rfc3339_opts(SecondsFormat::Secs, true);
        let url = self.subscription_url(
            "/providers/Microsoft.Commerce/UsageAggregates",
            &[
                ("api-version", USAGE_API_VERSION),
                ("reportedStartTime", start_text.as_str()),
                ("reportedEndTime", end_text.as_str()),
                ("aggregationGranularity", "Daily"),
                ("showDetails", "true"),
            ],
        )?;

        let mut page: ListResponse<UsageRecord> = self.get(url.as_str()).await?;
        let mut records = std::mem::take(&mut page.value);

        while let Some(next) = page.next().map(str::to_string) {
            debug!(fetched = records.len(), "Retrieving next batch of records");
            page = self.get(&next).await?;
            records.append(&mut page.value);
        }

        let summary = populate_instance_data(&mut records);
        debug!(
            records = records.len(),
            parsed = summary.parsed,
            undecodable = summary.undecodable,
            bad_uri = summary.bad_uri,
            "Parsed instance data"
        );

        Ok(records)
    }
}
