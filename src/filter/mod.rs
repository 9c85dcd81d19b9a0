//! Filter pipeline applied to candidate events before forwarding.
//!
//! Filters run in registration order against the same event. Each one may
//! pass, enrich the event's annotations, or veto it:
//!
//! ```text
//! FilterEngine
//!   - image-tag-checker
//!   - ingress-validator ---> ClusterLookup (bounded, fails open)
//!   - object-annotation-checker
//!   - pod-label-checker
//!   - node-events-checker
//! ```
//!
//! A filter that cannot complete its check returns an error; the engine logs
//! it and treats it as a pass.

mod engine;
mod error;
pub mod filters;
mod lookup;

pub use engine::{FilterEngine, FilterReport};
pub use error::FilterError;
pub use lookup::{ClusterLookup, ServicePort};

use crate::event::Event;

/// Decision returned by a filter that completed its check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Keep the event, possibly after enriching its annotations.
    Pass,
    /// Suppress the event with the given reason.
    Veto(String),
}

/// A single check in the filter pipeline.
///
/// Implementations must not keep per-event state: the same filter instance
/// evaluates many events concurrently.
pub trait Filter: Send + Sync {
    /// Filter name for logging and for `filters.disabled`.
    fn name(&self) -> &str;

    /// Short description of what the filter checks.
    fn describe(&self) -> &str;

    /// Evaluate the event, enriching `event.annotations` as needed.
    fn apply(&self, event: &mut Event) -> Result<Verdict, FilterError>;
}
