//! Honours per-object notification annotations.

use crate::event::Event;
use crate::filter::{Filter, FilterError, Verdict};

/// Set to `"true"` on an object to silence notifications about it.
pub const DISABLE_ANNOTATION: &str = "kubenotify.io/disable";

/// Routes notifications about the object to the named channel.
pub const CHANNEL_ANNOTATION: &str = "kubenotify.io/channel";

pub struct ObjectAnnotationChecker;

impl Filter for ObjectAnnotationChecker {
    fn name(&self) -> &str {
        "object-annotation-checker"
    }

    fn describe(&self) -> &str {
        "Checks if annotations kubenotify.io/* present in object specs and filters them."
    }

    fn apply(&self, event: &mut Event) -> Result<Verdict, FilterError> {
        if event.object_annotation(DISABLE_ANNOTATION) == Some("true") {
            return Ok(Verdict::Veto(format!(
                "{DISABLE_ANNOTATION} annotation set on {} {}",
                event.object_kind, event.name
            )));
        }

        if let Some(channel) = event
            .object_annotation(CHANNEL_ANNOTATION)
            .filter(|channel| !channel.is_empty())
            .map(str::to_string)
        {
            event.annotations.channel = Some(channel);
        }

        Ok(Verdict::Pass)
    }
}
