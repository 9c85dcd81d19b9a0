//! Recommends pinned image tags on newly created pods.

use serde_json::Value;

use crate::event::Event;
use crate::filter::{Filter, FilterError, Verdict};

pub struct ImageTagChecker;

impl Filter for ImageTagChecker {
    fn name(&self) -> &str {
        "image-tag-checker"
    }

    fn describe(&self) -> &str {
        "Checks and adds recommendation if 'latest' image tag is used for container image."
    }

    fn apply(&self, event: &mut Event) -> Result<Verdict, FilterError> {
        if !event.is_creation_of("Pod") {
            return Ok(Verdict::Pass);
        }

        let containers = event
            .object
            .pointer("/spec/containers")
            .and_then(Value::as_array)
            .ok_or_else(|| FilterError::MalformedObject {
                object_kind: "Pod".to_string(),
                reason: "spec.containers is missing".to_string(),
            })?;

        let recommendations: Vec<String> = containers
            .iter()
            .filter_map(|container| {
                let image = container.get("image").and_then(Value::as_str)?;
                let name = container.get("name").and_then(Value::as_str).unwrap_or_default();
                uses_latest_tag(image).then(|| {
                    format!(
                        ":latest tag used in image '{image}' of Container '{name}' should be avoided."
                    )
                })
            })
            .collect();

        event.annotations.recommendations.extend(recommendations);
        Ok(Verdict::Pass)
    }
}

/// An image without a tag resolves to `latest`. Digest references are pinned.
fn uses_latest_tag(image: &str) -> bool {
    if image.contains('@') {
        return false;
    }

    // A colon before the last slash belongs to a registry port.
    let last_segment = image.rsplit('/').next().unwrap_or(image);
    match last_segment.split_once(':') {
        Some((_, tag)) => tag == "latest",
        None => true,
    }
}
