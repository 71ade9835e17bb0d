//! Resource URI parsing.
//!
//! Azure resource URIs look like
//! `/subscriptions/{sub}/resourceGroups/{group}/providers/{namespace}/{type}/{name}`,
//! optionally followed by child resource segments. Leading separators are
//! trimmed before splitting, so the group is always segment 3 and the
//! resource name segment 7.

use thiserror::Error;

const SUBSCRIPTION_INDEX: usize = 1;
const GROUPS_MARKER_INDEX: usize = 2;
const GROUP_INDEX: usize = 3;
const RESOURCE_INDEX: usize = 7;
const MIN_SEGMENTS: usize = RESOURCE_INDEX + 1;

/// Errors produced when a resource URI does not have the expected shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceUriError {
    /// Fewer segments than a resource URI needs.
    #[error("resource URI has {segments} segments, expected at least 8: {uri:?}")]
    TooShort { uri: String, segments: usize },

    /// Segment 2 is not `resourceGroups`.
    #[error("resource URI is missing the resourceGroups segment: {0:?}")]
    MissingResourceGroups(String),

    /// A required segment is empty (e.g. `//` in the URI).
    #[error("resource URI has an empty segment at index {index}: {uri:?}")]
    EmptySegment { uri: String, index: usize },
}

/// The parts of a resource URI the extractor cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUri {
    /// Subscription ID.
    pub subscription_id: String,
    /// Resource group name.
    pub resource_group: String,
    /// Resource name.
    pub resource: String,
}

impl ResourceUri {
    /// Parse and validate a resource URI.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceUriError`] describing the first shape violation.
    pub fn parse(uri: &str) -> Result<Self, ResourceUriError> {
        let trimmed = trim_separators(uri);
        let parts: Vec<&str> = trimmed.split('/').collect();

        if parts.len() < MIN_SEGMENTS {
            return Err(ResourceUriError::TooShort {
                uri: uri.to_string(),
                segments: parts.len(),
            });
        }

        if !parts[GROUPS_MARKER_INDEX].eq_ignore_ascii_case("resourceGroups") {
            return Err(ResourceUriError::MissingResourceGroups(uri.to_string()));
        }

        for index in [SUBSCRIPTION_INDEX, GROUP_INDEX, RESOURCE_INDEX] {
            if parts[index].is_empty() {
                return Err(ResourceUriError::EmptySegment {
                    uri: uri.to_string(),
                    index,
                });
            }
        }

        Ok(Self {
            subscription_id: parts[SUBSCRIPTION_INDEX].to_string(),
            resource_group: parts[GROUP_INDEX].to_string(),
            resource: parts[RESOURCE_INDEX].to_string(),
        })
    }
}

/// Strip leading path separators.
#[must_use]
pub fn trim_separators(uri: &str) -> &str {
    uri.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    const VM_URI: &str = "/subscriptions/sub-1/resourceGroups/RG1/providers/Microsoft.Compute/virtualMachines/R1";

    #[test]
    fn test_parse_leading_slash() {
        let parsed = ResourceUri::parse(VM_URI).unwrap();
        assert_eq!(parsed.subscription_id, "sub-1");
        assert_eq!(parsed.resource_group, "RG1");
        assert_eq!(parsed.resource, "R1");
    }

    #[test]
    fn test_parse_already_trimmed_gives_same_positions() {
        let trimmed = trim_separators(VM_URI);
        assert_eq!(
            ResourceUri::parse(trimmed).unwrap(),
            ResourceUri::parse(VM_URI).unwrap()
        );
    }

    #[test]
    fn test_parse_child_resource_uses_parent_name() {
        let uri = "subscriptions/s/resourcegroups/rg/providers/Microsoft.Sql/servers/db-server/databases/orders";
        let parsed = ResourceUri::parse(uri).unwrap();
        assert_eq!(parsed.resource_group, "rg");
        assert_eq!(parsed.resource, "db-server");
    }

    #[test]
    fn test_parse_rejects_short_uri() {
        let err = ResourceUri::parse("/subscriptions/s/resourceGroups/rg").unwrap_err();
        assert_eq!(
            err,
            ResourceUriError::TooShort {
                uri: "/subscriptions/s/resourceGroups/rg".to_string(),
                segments: 4,
            }
        );
    }

    #[test]
    fn test_parse_rejects_empty_uri() {
        assert!(matches!(
            ResourceUri::parse(""),
            Err(ResourceUriError::TooShort { segments: 1, .. })
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_marker() {
        let uri = "/subscriptions/s/locations/westus/providers/Microsoft.Compute/virtualMachines/vm";
        assert!(matches!(
            ResourceUri::parse(uri),
            Err(ResourceUriError::MissingResourceGroups(_))
        ));
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        let uri = "/subscriptions/s/resourceGroups//providers/Microsoft.Compute/virtualMachines/vm";
        assert!(matches!(
            ResourceUri::parse(uri),
            Err(ResourceUriError::EmptySegment { index: 3, .. })
        ));
    }
}
