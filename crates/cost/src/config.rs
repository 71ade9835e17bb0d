//! Run configuration loaded from a JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::Aggregator;

/// Default Azure AD login endpoint.
pub const DEFAULT_LOGIN_URL: &str = "https://login.microsoftonline.com";

/// Default Azure Resource Manager endpoint.
pub const DEFAULT_MANAGEMENT_URL: &str = "https://management.azure.com";

/// Largest accepted `timeOffset`, in hours either way.
pub const MAX_TIME_OFFSET_HOURS: i64 = 7 * 24;

/// Errors loading or validating the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for [`Config`].
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required field is empty.
    #[error("missing required config field: {0}")]
    Missing(&'static str),

    /// A field has an unusable value.
    #[error("invalid config field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Static run parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Azure AD tenant.
    pub tenant_id: String,
    /// Human-readable subscription label used in output names and tags.
    pub subscription: String,
    /// Subscription to extract.
    pub subscription_id: String,
    /// Service principal client ID.
    pub client_id: String,
    /// Service principal secret.
    pub client_secret: String,

    /// Rate-card filter: offer durable ID (e.g. `MS-AZR-0003P`).
    #[serde(default)]
    pub offer_durable_id: String,
    /// Rate-card filter: currency.
    #[serde(default)]
    pub currency: String,
    /// Rate-card filter: locale.
    #[serde(default)]
    pub locale: String,
    /// Rate-card filter: region.
    #[serde(default)]
    pub region_info: String,

    /// Hours added to usage start times before bucketing.
    #[serde(default)]
    pub time_offset: i64,
    /// Multiplier applied to rate-card prices.
    #[serde(default = "default_rate_multiply")]
    pub rate_multiply: f64,
    /// Tag keys to resolve on every record, with their default values.
    #[serde(default)]
    pub tag_defaults: BTreeMap<String, String>,
    /// Resource group/resource name for records without instance data.
    #[serde(default = "default_missing")]
    pub missing_default: String,

    /// InfluxDB base URL.
    pub influx_host: String,
    /// InfluxDB database.
    #[serde(rename = "influxDB")]
    pub influx_db: String,
    /// InfluxDB measurement name.
    pub influx_measurement: String,
    /// Optional InfluxDB username.
    #[serde(default)]
    pub influx_username: Option<String>,
    /// Optional InfluxDB password.
    #[serde(default)]
    pub influx_password: Option<String>,

    /// Per-request timeout for all HTTP calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Azure AD login endpoint.
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// Azure Resource Manager endpoint.
    #[serde(default = "default_management_url")]
    pub management_url: String,
}

fn default_rate_multiply() -> f64 {
    1.0
}

fn default_missing() -> String {
    "unknown".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}

fn default_management_url() -> String {
    DEFAULT_MANAGEMENT_URL.to_string()
}

impl Config {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields and value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("tenantId", &self.tenant_id),
            ("subscription", &self.subscription),
            ("subscriptionId", &self.subscription_id),
            ("clientId", &self.client_id),
            ("clientSecret", &self.client_secret),
            ("influxHost", &self.influx_host),
            ("influxDB", &self.influx_db),
            ("influxMeasurement", &self.influx_measurement),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(field));
            }
        }

        if !self.rate_multiply.is_finite() {
            return Err(ConfigError::Invalid {
                field: "rateMultiply",
                reason: format!("{} is not a finite number", self.rate_multiply),
            });
        }

        if !(-MAX_TIME_OFFSET_HOURS..=MAX_TIME_OFFSET_HOURS).contains(&self.time_offset) {
            return Err(ConfigError::Invalid {
                field: "timeOffset",
                reason: format!(
                    "{} hours is outside -{MAX_TIME_OFFSET_HOURS}..={MAX_TIME_OFFSET_HOURS}",
                    self.time_offset
                ),
            });
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "requestTimeoutSecs",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Per-request HTTP timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Bucketing shift applied to usage start times.
    #[must_use]
    pub fn time_offset(&self) -> chrono::Duration {
        chrono::Duration::hours(self.time_offset)
    }

    /// Aggregator configured from this run's settings.
    #[must_use]
    pub fn aggregator(&self) -> Aggregator<'_> {
        Aggregator::new(
            &self.subscription,
            &self.missing_default,
            self.time_offset(),
            &self.tag_defaults,
        )
    }

    /// CSV output path for this run inside `output_dir`.
    #[must_use]
    pub fn csv_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("_{}.csv", self.subscription))
    }
}
