//! Event model: subscription keys, raw watch notifications and candidate events.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClassifyError;

/// Resource type of core Kubernetes `Event` objects.
///
/// Events of this type describe another object, so classification takes the
/// kind and name from `involvedObject` instead of the event itself.
pub const CORE_EVENTS_RESOURCE: &str = "v1/events";

/// Type of change observed on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Create,
    Update,
    Delete,
    Error,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Create,
        EventType::Update,
        EventType::Delete,
        EventType::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Create => "create",
            EventType::Update => "update",
            EventType::Delete => "delete",
            EventType::Error => "error",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite subscription key.
///
/// Equality and hashing cover all three fields; the registry only answers
/// exact matches on this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventKind {
    pub resource: String,
    pub namespace: String,
    pub event_type: EventType,
}

impl EventKind {
    pub fn new(
        resource: impl Into<String>,
        namespace: impl Into<String>,
        event_type: EventType,
    ) -> Self {
        Self {
            resource: resource.into(),
            namespace: namespace.into(),
            event_type,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.event_type, self.namespace, self.resource)
    }
}

/// Severity attached to a forwarded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
    Critical,
}

impl From<EventType> for Level {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Create | EventType::Update => Level::Info,
            EventType::Delete => Level::Warn,
            EventType::Error => Level::Error,
        }
    }
}

/// Which filter vetoed an event, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suppression {
    pub filter: String,
    pub reason: String,
}

/// Mutable result record filled in by the filter pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct EventAnnotations {
    pub level: Level,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    /// Channel override requested by the object itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppressed: Option<Suppression>,
    /// Filters that could not complete their check and were treated as a pass.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_open: Vec<String>,
}

impl EventAnnotations {
    fn for_type(event_type: EventType) -> Self {
        Self {
            level: event_type.into(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
            channel: None,
            suppressed: None,
            failed_open: Vec::new(),
        }
    }
}

/// A change notification as delivered by the cluster watch layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub object: Value,
    #[serde(default)]
    pub namespace: String,
    /// Canonical resource type string, e.g. `apps/v1/deployments`.
    pub resource: String,
    pub event_type: EventType,
}

impl RawEvent {
    pub fn new(
        object: Value,
        namespace: impl Into<String>,
        resource: impl Into<String>,
        event_type: EventType,
    ) -> Self {
        Self {
            object,
            namespace: namespace.into(),
            resource: resource.into(),
            event_type,
        }
    }

    pub fn kind(&self) -> EventKind {
        EventKind::new(self.resource.clone(), self.namespace.clone(), self.event_type)
    }
}

/// Candidate event flowing through the filter pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub name: String,
    /// Kind of the object the change is about, e.g. `Pod`.
    pub object_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub cluster: String,
    pub timestamp: DateTime<Utc>,
    pub object: Value,
    pub annotations: EventAnnotations,
}

impl Event {
    /// Build a candidate event from a raw notification.
    pub fn classify(raw: RawEvent, cluster: &str) -> Result<Self, ClassifyError> {
        let kind = raw.kind();
        let object = raw.object;
        if !object.is_object() {
            return Err(ClassifyError::NotAnObject);
        }

        let (object_kind, name) = if kind.resource == CORE_EVENTS_RESOURCE {
            let involved = object
                .get("involvedObject")
                .ok_or(ClassifyError::MissingField {
                    field: "involvedObject",
                })?;
            (
                required_str(involved, "kind", "involvedObject.kind")?,
                required_str(involved, "name", "involvedObject.name")?,
            )
        } else {
            let metadata = object.get("metadata").ok_or(ClassifyError::MissingField {
                field: "metadata",
            })?;
            (
                required_str(&object, "kind", "kind")?,
                required_str(metadata, "name", "metadata.name")?,
            )
        };

        let reason = optional_str(&object, "reason");
        let message = optional_str(&object, "message");
        let annotations = EventAnnotations::for_type(kind.event_type);

        Ok(Self {
            kind,
            name,
            object_kind,
            reason,
            message,
            cluster: cluster.to_string(),
            timestamp: Utc::now(),
            object,
            annotations,
        })
    }

    pub fn event_type(&self) -> EventType {
        self.kind.event_type
    }

    pub fn namespace(&self) -> &str {
        &self.kind.namespace
    }

    /// Whether this event is the creation of an object of the given kind.
    pub fn is_creation_of(&self, object_kind: &str) -> bool {
        self.kind.event_type == EventType::Create && self.object_kind == object_kind
    }

    /// Look up a `metadata.annotations` entry on the payload.
    pub fn object_annotation(&self, key: &str) -> Option<&str> {
        self.object
            .pointer("/metadata/annotations")
            .and_then(|annotations| annotations.get(key))
            .and_then(Value::as_str)
    }

    /// Number of `metadata.labels` entries on the payload.
    pub fn label_count(&self) -> usize {
        self.object
            .pointer("/metadata/labels")
            .and_then(Value::as_object)
            .map_or(0, |labels| labels.len())
    }

    pub fn is_suppressed(&self) -> bool {
        self.annotations.suppressed.is_some()
    }

    /// One-line human readable summary, followed by any warnings and
    /// recommendations collected by filters.
    pub fn short_message(&self) -> String {
        let target = if self.kind.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.kind.namespace, self.name)
        };

        let mut msg = match self.kind.event_type {
            EventType::Create => format!(
                "{} {target} has been created in {} cluster",
                self.object_kind, self.cluster
            ),
            EventType::Update => format!(
                "{} {target} has been updated in {} cluster",
                self.object_kind, self.cluster
            ),
            EventType::Delete => format!(
                "{} {target} has been deleted in {} cluster",
                self.object_kind, self.cluster
            ),
            EventType::Error => format!(
                "{} {target} reported an error in {} cluster",
                self.object_kind, self.cluster
            ),
        };

        match (&self.reason, &self.message) {
            (Some(reason), Some(message)) => msg.push_str(&format!(": {reason}: {message}")),
            (Some(reason), None) => msg.push_str(&format!(": {reason}")),
            (None, Some(message)) => msg.push_str(&format!(": {message}")),
            (None, None) => {}
        }

        for warning in &self.annotations.warnings {
            msg.push_str(&format!("\nWarning: {warning}"));
        }
        for recommendation in &self.annotations.recommendations {
            msg.push_str(&format!("\nRecommendation: {recommendation}"));
        }

        msg
    }
}

fn required_str(value: &Value, key: &str, field: &'static str) -> Result<String, ClassifyError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ClassifyError::MissingField { field })
}

fn optional_str(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}
