//! Azure billing provider.
//!
//! Implements [`BillingProvider`](crate::providers::BillingProvider) on top of
//! the Azure Commerce APIs:
//!
//! - **Rate Card** - meter prices for an offer, currency, locale and region
//! - **Usage Aggregates** - daily usage line items with embedded instance data
//! - **Resource Groups** - group names and tags, used as a tag fallback
//!
//! Authentication uses the OAuth2 client-credentials grant against Azure AD
//! with a service principal.

mod client;
mod models;

pub use client::Azure;
pub use models::*;
