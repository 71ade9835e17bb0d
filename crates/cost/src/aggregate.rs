//! Aggregation of priced usage records into time-bucketed cost points.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, SecondsFormat, Utc};
use serde::Serialize;

use crate::usage::{ResourceUri, UsageRecord};

/// Fixed correction added to every bucket on top of the configured offset.
const BUCKET_CORRECTION_HOURS: i64 = 1;

/// One aggregated output row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub subscription_id: String,
    /// Configured subscription label.
    pub subscription: String,
    pub meter_id: String,
    pub meter_category: String,
    pub meter_sub_category: String,
    pub resource_group: String,
    pub resource: String,
    pub bill_period: String,
    /// Summed quantity.
    pub quantity: f64,
    /// Summed `rate * quantity`.
    pub cost: f64,
    /// Tag snapshot taken from the first record of this point.
    pub tags: BTreeMap<String, String>,
    /// Bucketed timestamp.
    pub timestamp: DateTime<Utc>,
}

impl Point {
    /// Month of the bucketed timestamp (1-12).
    #[must_use]
    pub fn month(&self) -> u32 {
        self.timestamp.month()
    }

    /// Day of month of the bucketed timestamp.
    #[must_use]
    pub fn day(&self) -> u32 {
        self.timestamp.day()
    }
}

/// Aggregated points keyed by their composite key.
pub type Points = BTreeMap<String, Point>;

/// Groups records into [`Point`]s.
#[derive(Debug, Clone)]
pub struct Aggregator<'a> {
    subscription: &'a str,
    missing_default: &'a str,
    time_offset: Duration,
    tag_defaults: &'a BTreeMap<String, String>,
}

impl<'a> Aggregator<'a> {
    /// Create an aggregator.
    ///
    /// * `subscription` - label written to every point
    /// * `missing_default` - resource group/resource for records without instance data
    /// * `time_offset` - shift applied to usage start times before bucketing
    /// * `tag_defaults` - tag keys to snapshot, with their default values
    #[must_use]
    pub fn new(
        subscription: &'a str,
        missing_default: &'a str,
        time_offset: Duration,
        tag_defaults: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            subscription,
            missing_default,
            time_offset,
            tag_defaults,
        }
    }

    /// Bucketed timestamp for a record.
    #[must_use]
    pub fn bucket(&self, record: &UsageRecord) -> DateTime<Utc> {
        record.properties.usage_start_time
            + self.time_offset
            + Duration::hours(BUCKET_CORRECTION_HOURS)
    }

    /// Resource group and resource used in the key.
    fn resource_names(&self, record: &UsageRecord) -> (String, String) {
        record
            .properties
            .instance_data
            .as_ref()
            .and_then(|data| ResourceUri::parse(&data.resources.resource_uri).ok())
            .map_or_else(
                || (self.missing_default.to_string(), self.missing_default.to_string()),
                |uri| (uri.resource_group, uri.resource),
            )
    }

    /// Fold records into points. The result does not depend on record order.
    #[must_use]
    pub fn aggregate(&self, records: &[UsageRecord]) -> Points {
        let mut points = Points::new();

        for record in records {
            let props = &record.properties;
            let (resource_group, resource) = self.resource_names(record);
            let timestamp = self.bucket(record);

            let key = format!(
                "{}/{}/{}/{}/{}/{}/{}/{}",
                props.subscription_id,
                props.meter_id,
                props.meter_category,
                props.meter_sub_category,
                resource_group,
                resource,
                record.bill_period(),
                timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            );

            let point = points.entry(key).or_insert_with(|| Point {
                subscription_id: props.subscription_id.clone(),
                subscription: self.subscription.to_string(),
                meter_id: props.meter_id.clone(),
                meter_category: props.meter_category.clone(),
                meter_sub_category: props.meter_sub_category.clone(),
                resource_group,
                resource,
                bill_period: record.bill_period().to_string(),
                quantity: 0.0,
                cost: 0.0,
                tags: self.snapshot_tags(record),
                timestamp,
            });

            point.quantity += props.quantity;
            point.cost += props.rate * props.quantity;
        }

        points
    }

    /// Tag set for a new point.
    ///
    /// Base fields use the record's derived resource names, not the key's.
    /// Configured tags are stored with a leading underscore and only replaced
    /// by string instance tags.
    #[must_use]
    pub fn snapshot_tags(&self, record: &UsageRecord) -> BTreeMap<String, String> {
        let props = &record.properties;
        let mut tags = BTreeMap::from([
            ("SubscriptionID".to_string(), props.subscription_id.clone()),
            ("Subscription".to_string(), self.subscription.to_string()),
            ("MeterID".to_string(), props.meter_id.clone()),
            ("MeterCategory".to_string(), props.meter_category.clone()),
            ("MeterSubCategory".to_string(), props.meter_sub_category.clone()),
            ("BillPeriod".to_string(), record.bill_period().to_string()),
            ("ResourceGroup".to_string(), props.resource_group.clone()),
            ("Resource".to_string(), props.resource.clone()),
        ]);

        for (key, value) in self.tag_defaults {
            tags.insert(format!("_{key}"), value.clone());
        }

        if let Some(instance_tags) = record.tags() {
            for (key, value) in instance_tags {
                let prefixed = format!("_{key}");
                if let (Some(slot), Some(text)) = (tags.get_mut(&prefixed), value.as_text()) {
                    *slot = text.to_string();
                }
            }
        }

        tags
    }
}

/// Sum quantity and cost over all points, for logging.
#[must_use]
pub fn totals(points: &Points) -> (f64, f64) {
    points
        .values()
        .fold((0.0, 0.0), |(q, c), p| (q + p.quantity, c + p.cost))
}

/// Number of points per meter category, for logging.
#[must_use]
pub fn count_by_category(points: &Points) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for point in points.values() {
        *counts.entry(point.meter_category.as_str()).or_default() += 1;
    }
    counts
}
