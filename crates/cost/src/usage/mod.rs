//! Usage records and the parsing of their embedded instance data.

mod instance;
mod models;
mod resource_uri;

pub use instance::{decode_instance_data, populate_instance_data, ParseSummary};
pub use models::{
    Group, InstanceData, Meter, ResourceInfo, TagValue, Tags, UsageProperties, UsageRecord,
};
pub use resource_uri::{trim_separators, ResourceUri, ResourceUriError};
