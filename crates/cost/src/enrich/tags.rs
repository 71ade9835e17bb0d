//! Tag defaulting.
//!
//! Each configured tag key is resolved per record with a three-tier
//! fallback: a non-empty string tag already on the instance wins, then the
//! owning resource group's tag, then the configured default.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::usage::{Group, TagValue, UsageRecord};

/// Counts from a resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagResolution {
    /// Tags copied from the record's resource group.
    pub from_group: usize,
    /// Tags set to the configured default.
    pub from_default: usize,
    /// Records skipped because they carry no instance data.
    pub skipped_records: usize,
}

impl TagResolution {
    /// Total number of tags written.
    #[must_use]
    pub fn filled(&self) -> usize {
        self.from_group + self.from_default
    }
}

/// Fill in missing tags on every record.
///
/// Writes only to the instance tag map of records that have instance data.
/// A tag counts as missing when it is absent, an empty string, or not a
/// string at all. Running this twice over the same records changes nothing
/// the second time.
pub fn resolve_tags(
    records: &mut [UsageRecord],
    groups: &HashMap<String, Group>,
    defaults: &BTreeMap<String, String>,
) -> TagResolution {
    let mut resolution = TagResolution::default();

    for record in records.iter_mut() {
        let group = groups.get(record.properties.resource_group.as_str());

        let Some(tags) = record.tags_mut() else {
            resolution.skipped_records += 1;
            continue;
        };

        for (key, default) in defaults {
            if tags.get(key).is_some_and(TagValue::is_set) {
                continue;
            }

            if let Some(value) = group.and_then(|g| g.tags.get(key)) {
                debug!(tag = %key, group = ?group.map(|g| &g.name), "Using resource group tag");
                tags.insert(key.clone(), value.clone());
                resolution.from_group += 1;
                continue;
            }

            tags.insert(key.clone(), TagValue::text(default.as_str()));
            resolution.from_default += 1;
        }
    }

    resolution
}
