//! Built-in filters, in registration order.

mod image_tag;
mod ingress;
mod node_events;
mod object_annotation;
mod pod_label;

pub use image_tag::ImageTagChecker;
pub use ingress::IngressValidator;
pub use node_events::NodeEventsChecker;
pub use object_annotation::{CHANNEL_ANNOTATION, DISABLE_ANNOTATION, ObjectAnnotationChecker};
pub use pod_label::PodLabelChecker;

use std::sync::Arc;

use crate::config::FilterConfig;

use super::{ClusterLookup, Filter};

/// Every built-in filter in execution order.
///
/// The ingress validator needs cluster access and is left out without a lookup.
pub fn all_filters(
    config: &FilterConfig,
    lookup: Option<Arc<dyn ClusterLookup>>,
) -> Vec<Box<dyn Filter>> {
    let mut filters: Vec<Box<dyn Filter>> = vec![Box::new(ImageTagChecker)];

    match lookup {
        Some(lookup) => filters.push(Box::new(IngressValidator::new(
            lookup,
            config.lookup_timeout(),
        ))),
        None => crate::debug_event!("filter", "skipped", "ingress-validator has no cluster lookup"),
    }

    filters.push(Box::new(ObjectAnnotationChecker));
    filters.push(Box::new(PodLabelChecker));
    filters.push(Box::new(NodeEventsChecker));
    filters
}
