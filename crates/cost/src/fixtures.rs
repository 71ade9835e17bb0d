//! Shared builders for unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::usage::{Group, InstanceData, ResourceInfo, TagValue, Tags, UsageProperties, UsageRecord};

pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn vm_uri(group: &str, name: &str) -> String {
    format!("subscriptions/S1/resourceGroups/{group}/providers/Microsoft.Compute/virtualMachines/{name}")
}

pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), TagValue::text(*v)))
        .collect()
}

pub fn group(name: &str, pairs: &[(&str, &str)]) -> Group {
    Group {
        id: format!("/subscriptions/S1/resourceGroups/{name}"),
        name: name.to_string(),
        location: "westeurope".to_string(),
        tags: tags(pairs),
    }
}

/// Builder for usage records with sensible defaults.
pub struct RecordBuilder {
    record: UsageRecord,
}

impl RecordBuilder {
    pub fn new() -> Self {
        let start = day(2024, 1, 5);
        Self {
            record: UsageRecord {
                id: "rec".to_string(),
                name: "2024-01".to_string(),
                record_type: "Microsoft.Commerce/UsageAggregate".to_string(),
                properties: UsageProperties {
                    subscription_id: "S1".to_string(),
                    usage_start_time: start,
                    usage_end_time: start + chrono::Duration::days(1),
                    meter_id: "M1".to_string(),
                    meter_name: "Compute Hours".to_string(),
                    meter_region: "EU West".to_string(),
                    meter_category: "C".to_string(),
                    meter_sub_category: "SC".to_string(),
                    unit: "Hours".to_string(),
                    quantity: 1.0,
                    instance_data_text: String::new(),
                    instance_data: None,
                    resource_group: String::new(),
                    resource: String::new(),
                    rate: 0.0,
                },
            },
        }
    }

    pub fn meter(mut self, meter_id: &str) -> Self {
        self.record.properties.meter_id = meter_id.to_string();
        self
    }

    pub fn quantity(mut self, quantity: f64) -> Self {
        self.record.properties.quantity = quantity;
        self
    }

    pub fn rate(mut self, rate: f64) -> Self {
        self.record.properties.rate = rate;
        self
    }

    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.record.properties.usage_start_time = start;
        self.record.properties.usage_end_time = start + chrono::Duration::days(1);
        self
    }

    pub fn instance_text(mut self, text: &str) -> Self {
        self.record.properties.instance_data_text = text.to_string();
        self
    }

    /// Attach already-parsed instance data, as the parser would.
    pub fn resource(mut self, group: &str, name: &str, tags: Tags) -> Self {
        self.record.properties.instance_data = Some(InstanceData {
            resources: ResourceInfo {
                resource_uri: vm_uri(group, name),
                location: "westeurope".to_string(),
                tags,
            },
        });
        self.record.properties.resource_group = group.to_string();
        self.record.properties.resource = name.to_string();
        self
    }

    pub fn build(self) -> UsageRecord {
        self.record
    }
}
