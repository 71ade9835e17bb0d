#![allow(clippy::doc_markdown)] // Allow brand names like InfluxDB, OAuth without backticks

//! Daily cloud cost extraction for Azure subscriptions.
//!
//! This crate pulls usage data from the Azure Commerce APIs, prices it against
//! the subscription's rate card, fills in cost-allocation tags and writes
//! hourly-bucketed cost points to a CSV file and to InfluxDB.
//!
//! ## Pipeline
//!
//! For every day in the requested range:
//!
//! 1. **Fetch** - usage aggregates for the 24-hour window, following pagination
//!    ([`providers::Azure`])
//! 2. **Parse** - decode each record's `instanceData` into resource URI and
//!    tags ([`usage::populate_instance_data`])
//! 3. **Tag** - fill configured tags from the resource group or a default
//!    ([`enrich::resolve_tags`])
//! 4. **Price** - attach the rate-card rate ([`enrich::apply_rates`])
//! 5. **Aggregate** - one point per meter, resource and hour bucket
//!    ([`aggregate::Aggregator`])
//! 6. **Write** - CSV rows and InfluxDB line protocol ([`sinks`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cloud_cost::{Azure, BillingProvider, Config, CsvWriter, DateRange, Extractor, InfluxWriter};
//! use chrono::NaiveDate;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Path::new("config.json"))?;
//!     let azure = Azure::connect(&config).await?;
//!     let groups = azure.get_groups().await?;
//!     let influx = InfluxWriter::new(&config)?;
//!     let mut csv = CsvWriter::create(&config.csv_path(Path::new("data")))?;
//!
//!     let range = DateRange::new(
//!         NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!         NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
//!     );
//!     let summary = Extractor::new(&azure, &influx, &config, &groups)
//!         .run(range, &mut csv)
//!         .await?;
//!
//!     println!("{} points over {} days", summary.points, summary.days);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! A single JSON file with camelCase keys, see [`Config`].

pub mod aggregate;
pub mod config;
pub mod enrich;
pub mod extract;
pub mod providers;
pub mod sinks;
pub mod usage;

#[cfg(test)]
mod fixtures;

pub use aggregate::{Aggregator, Point, Points};
pub use config::{Config, ConfigError};
pub use extract::{DateRange, ExtractError, ExtractSummary, Extractor};
pub use providers::{Azure, BillingProvider, BillingProviderError};
pub use sinks::{CsvWriter, InfluxWriter, MetricsSink, SinkError};
pub use usage::{Group, Meter, TagValue, UsageRecord};
