//! Billing domain models: usage records, instance data, meters and groups.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Tag values
// ============================================================================

/// A single resource tag value.
///
/// Tags arrive as arbitrary JSON. Only `Text` values take part in tag
/// resolution and point snapshots; anything else is carried as `Other` and
/// treated as unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    /// A string tag.
    Text(String),
    /// Any non-string JSON value (number, bool, object, array, null).
    Other(serde_json::Value),
}

impl TagValue {
    /// Build a text tag.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// The string value, if this is a text tag.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Other(_) => None,
        }
    }

    /// Whether this value counts as set: a non-empty string.
    #[must_use]
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Text(s) if !s.is_empty())
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for TagValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Tag mapping as delivered by the provider.
pub type Tags = HashMap<String, TagValue>;

/// Providers send `"tags": null` for untagged resources.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Tags, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Tags>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Usage records
// ============================================================================

/// Resource metadata embedded in a usage record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    /// Full resource URI.
    #[serde(default)]
    pub resource_uri: String,
    /// Azure region of the resource.
    #[serde(default)]
    pub location: String,
    /// Resource tags. Always present after parsing.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Tags,
}

/// Structured form of a record's `instanceData` text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceData {
    /// Resource details.
    #[serde(rename = "Microsoft.Resources", default)]
    pub resources: ResourceInfo,
}

/// Properties of a usage record.
///
/// Fields marked "derived" are not part of the wire format; they are filled
/// in by the enrichment stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageProperties {
    /// Subscription the usage belongs to.
    #[serde(default)]
    pub subscription_id: String,
    /// Start of the usage window.
    pub usage_start_time: DateTime<Utc>,
    /// End of the usage window.
    pub usage_end_time: DateTime<Utc>,
    /// Meter identifier.
    #[serde(default)]
    pub meter_id: String,
    /// Meter display name.
    #[serde(default)]
    pub meter_name: String,
    /// Meter region.
    #[serde(default)]
    pub meter_region: String,
    /// Meter category (e.g. "Virtual Machines").
    #[serde(default)]
    pub meter_category: String,
    /// Meter subcategory.
    #[serde(default)]
    pub meter_sub_category: String,
    /// Unit of measure.
    #[serde(default)]
    pub unit: String,
    /// Consumed quantity.
    #[serde(default)]
    pub quantity: f64,
    /// Raw embedded instance data (a JSON document in a string).
    #[serde(rename = "instanceData", default)]
    pub instance_data_text: String,

    /// Derived: parsed instance data, `None` when the text did not decode.
    #[serde(skip)]
    pub instance_data: Option<InstanceData>,
    /// Derived: resource group name taken from the resource URI.
    #[serde(skip)]
    pub resource_group: String,
    /// Derived: resource name taken from the resource URI.
    #[serde(skip)]
    pub resource: String,
    /// Derived: effective unit rate from the rate card.
    #[serde(skip)]
    pub rate: f64,
}

/// One raw billing line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Record identifier.
    #[serde(default)]
    pub id: String,
    /// Bill period name.
    #[serde(default)]
    pub name: String,
    /// Record type.
    #[serde(rename = "type", default)]
    pub record_type: String,
    /// Record details.
    pub properties: UsageProperties,
}

impl UsageRecord {
    /// Bill period this record belongs to.
    #[must_use]
    pub fn bill_period(&self) -> &str {
        &self.name
    }

    /// Mutable access to the record's instance tags, if instance data exists.
    pub fn tags_mut(&mut self) -> Option<&mut Tags> {
        self.properties
            .instance_data
            .as_mut()
            .map(|data| &mut data.resources.tags)
    }

    /// The record's instance tags, if instance data exists.
    #[must_use]
    pub fn tags(&self) -> Option<&Tags> {
        self.properties
            .instance_data
            .as_ref()
            .map(|data| &data.resources.tags)
    }
}

// ============================================================================
// Rate card
// ============================================================================

/// A rate-card entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Meter {
    /// Meter identifier.
    #[serde(rename = "MeterId")]
    pub meter_id: String,
    /// Meter display name.
    #[serde(default)]
    pub meter_name: String,
    /// Meter category.
    #[serde(default)]
    pub meter_category: String,
    /// Meter subcategory.
    #[serde(default)]
    pub meter_sub_category: String,
    /// Meter region.
    #[serde(default)]
    pub meter_region: String,
    /// Meter status.
    #[serde(default)]
    pub meter_status: String,
    /// Unit of measure.
    #[serde(default)]
    pub unit: String,
    /// Rates keyed by tier index. Only `"0"` is used.
    #[serde(default)]
    pub meter_rates: HashMap<String, f64>,
    /// Date the rates took effect, as reported.
    #[serde(default)]
    pub effective_date: Option<String>,
    /// Quantity included free of charge.
    #[serde(default)]
    pub included_quantity: f64,
}

impl Meter {
    /// Base-tier unit rate, zero when the tier is absent.
    #[must_use]
    pub fn base_rate(&self) -> f64 {
        self.meter_rates.get("0").copied().unwrap_or(0.0)
    }
}

// ============================================================================
// Resource groups
// ============================================================================

/// An Azure resource group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Group {
    /// Resource ID.
    #[serde(default)]
    pub id: String,
    /// Group name.
    pub name: String,
    /// Location.
    #[serde(default)]
    pub location: String,
    /// Group tags, used as a fallback tag source.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Tags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_value_decodes_strings_and_others() {
        let tags: Tags =
            serde_json::from_str(r#"{"Env":"prod","Count":3,"Flag":true,"Empty":""}"#).unwrap();

        assert_eq!(tags["Env"], TagValue::text("prod"));
        assert_eq!(tags["Count"], TagValue::Other(serde_json::json!(3)));
        assert_eq!(tags["Flag"].as_text(), None);
        assert!(!tags["Empty"].is_set());
        assert!(tags["Env"].is_set());
    }

    #[test]
    fn test_usage_record_deserialize() {
        let json = r#"{
            "id": "/subscriptions/s1/providers/Microsoft.Commerce/UsageAggregates/x",
            "name": "2024-01",
            "type": "Microsoft.Commerce/UsageAggregate",
            "properties": {
                "subscriptionId": "s1",
                "usageStartTime": "2024-01-05T00:00:00+00:00",
                "usageEndTime": "2024-01-06T00:00:00+00:00",
                "meterName": "Compute Hours",
                "meterCategory": "Virtual Machines",
                "meterSubCategory": "Standard_D2",
                "unit": "Hours",
                "instanceData": "{}",
                "meterId": "m1",
                "quantity": 24.0
            }
        }"#;

        let record: UsageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.bill_period(), "2024-01");
        assert_eq!(record.properties.meter_id, "m1");
        assert!((record.properties.quantity - 24.0).abs() < f64::EPSILON);
        assert!(record.properties.instance_data.is_none());
        assert!(record.properties.rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_meter_base_rate() {
        let meter: Meter = serde_json::from_str(
            r#"{"MeterId":"m1","MeterCategory":"Storage","MeterRates":{"0":0.05,"100":0.04}}"#,
        )
        .unwrap();
        assert!((meter.base_rate() - 0.05).abs() < f64::EPSILON);

        let tiered_only = Meter {
            meter_rates: HashMap::from([("10".to_string(), 1.0)]),
            ..Default::default()
        };
        assert!(tiered_only.base_rate().abs() < f64::EPSILON);
    }
}
