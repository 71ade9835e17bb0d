//! Record enrichment: tag defaulting and rate-card pricing.
//!
//! Both passes mutate records in place and touch disjoint fields: tag
//! resolution writes the instance tag map, pricing writes the rate. The
//! aggregator reads both, so both must run before it.

mod rates;
mod tags;

pub use rates::{apply_rates, RateSummary};
pub use tags::{resolve_tags, TagResolution};
