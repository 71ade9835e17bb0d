//! Decoding of the `instanceData` text embedded in usage records.

use tracing::{debug, warn};

use super::models::{InstanceData, UsageRecord};
use super::resource_uri::{trim_separators, ResourceUri};

/// Counts from a parse pass, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    /// Records whose instance data decoded.
    pub parsed: usize,
    /// Records left without instance data.
    pub undecodable: usize,
    /// Decoded records whose resource URI was rejected.
    pub bad_uri: usize,
}

/// Decode instance data text. `None` for anything that is not a JSON object
/// of the expected shape, including a literal `null`.
#[must_use]
pub fn decode_instance_data(text: &str) -> Option<InstanceData> {
    match serde_json::from_str::<Option<InstanceData>>(text) {
        Ok(data) => data,
        Err(e) => {
            debug!(error = %e, "Instance data did not decode");
            None
        }
    }
}

/// Populate `instance_data`, `resource_group` and `resource` on each record.
///
/// Decode failures leave the record without instance data. A decoded record
/// always ends up with a tag map and a resource URI without leading
/// separators; when the URI is malformed the derived names stay empty.
pub fn populate_instance_data(records: &mut [UsageRecord]) -> ParseSummary {
    let mut summary = ParseSummary::default();

    for record in records.iter_mut() {
        let props = &mut record.properties;

        let Some(mut data) = decode_instance_data(&props.instance_data_text) else {
            props.instance_data = None;
            summary.undecodable += 1;
            continue;
        };

        data.resources.resource_uri = trim_separators(&data.resources.resource_uri).to_string();

        match ResourceUri::parse(&data.resources.resource_uri) {
            Ok(uri) => {
                props.resource_group = uri.resource_group;
                props.resource = uri.resource;
            }
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "Skipping resource names for record");
                summary.bad_uri += 1;
            }
        }

        props.instance_data = Some(data);
        summary.parsed += 1;
    }

    summary
}
