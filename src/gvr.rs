//! Canonical resource identifiers.
//!
//! Resource types travel through the system as strings of the form
//! `{version}/{resource}` (core group) or `{group}/{version}/{resource}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a resource identifier has the wrong shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseGvrError {
    #[error("invalid string: expected 2 or 3 parts when split by \"/\"")]
    InvalidFormat { input: String },
}

/// Group/Version/Resource triple identifying a Kubernetes resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// Whether this resource lives in the core (empty) API group.
    pub fn is_core(&self) -> bool {
        self.group.is_empty()
    }
}

/// Parse a canonical resource string.
///
/// Exactly two or three `/`-separated segments are accepted, none of them
/// empty. Segment contents are otherwise not validated.
pub fn decode(input: &str) -> Result<GroupVersionResource, ParseGvrError> {
    let parts: Vec<&str> = input.split('/').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(invalid_format(input));
    }
    match parts.as_slice() {
        [version, resource] => Ok(GroupVersionResource::new("", *version, *resource)),
        [group, version, resource] => Ok(GroupVersionResource::new(*group, *version, *resource)),
        _ => Err(invalid_format(input)),
    }
}

fn invalid_format(input: &str) -> ParseGvrError {
    ParseGvrError::InvalidFormat {
        input: input.to_string(),
    }
}

/// Format a resource as its canonical string. Inverse of [`decode`].
pub fn encode(gvr: &GroupVersionResource) -> String {
    gvr.to_string()
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.resource)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.resource)
        }
    }
}

impl FromStr for GroupVersionResource {
    type Err = ParseGvrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_without_group() {
        let gvr = decode("v1/persistentvolumes").unwrap();
        assert_eq!(gvr, GroupVersionResource::new("", "v1", "persistentvolumes"));
        assert!(gvr.is_core());
    }

    #[test]
    fn test_decode_with_group() {
        let gvr = decode("apps/v1/daemonsets").unwrap();
        assert_eq!(gvr, GroupVersionResource::new("apps", "v1", "daemonsets"));
    }

    #[test]
    fn test_decode_dotted_group() {
        let gvr: GroupVersionResource = "rbac.authorization.k8s.io/v1/clusterroles"
            .parse()
            .unwrap();
        assert_eq!(gvr.group, "rbac.authorization.k8s.io");
        assert_eq!(gvr.version, "v1");
        assert_eq!(gvr.resource, "clusterroles");
    }

    #[test]
    fn test_decode_rejects_other_shapes() {
        for input in [
            "foo/bar/baz/qux",
            "pods",
            "",
            // empty segments never fall back to a default group
            "/v1/pods",
            "v1/",
            "/pods",
            "//",
            "apps//deployments",
        ] {
            let err = decode(input).unwrap_err();
            assert_eq!(
                err.to_string(),
                "invalid string: expected 2 or 3 parts when split by \"/\""
            );
            assert_eq!(
                err,
                ParseGvrError::InvalidFormat {
                    input: input.to_string()
                }
            );
        }
    }

    #[test]
    fn test_encode_is_inverse_of_decode() {
        for input in [
            "v1/pods",
            "apps/v1/deployments",
            "networking.k8s.io/v1/ingresses",
        ] {
            assert_eq!(encode(&decode(input).unwrap()), input);
        }

        let gvr = GroupVersionResource::new("batch", "v1", "jobs");
        assert_eq!(decode(&encode(&gvr)).unwrap(), gvr);
    }
}
