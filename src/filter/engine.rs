//! Ordered filter execution.

use std::sync::Arc;

use crate::config::FilterConfig;
use crate::event::{Event, Suppression};

use super::filters;
use super::{ClusterLookup, Filter, Verdict};

/// What happened to an event inside the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    /// First filter that vetoed the event, if any.
    pub veto: Option<Suppression>,
    /// Filters whose check failed and were treated as a pass.
    pub failed_open: Vec<String>,
}

impl FilterReport {
    pub fn is_vetoed(&self) -> bool {
        self.veto.is_some()
    }
}

/// Ordered chain of filters.
///
/// `register` takes `&mut self`: filters are added during initialization,
/// before the engine is shared. Calling it while `run` executes on other
/// threads is not supported. `run` takes `&self` and may be called
/// concurrently for distinct events.
#[derive(Default)]
pub struct FilterEngine {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with every built-in filter not listed in `config.disabled`.
    ///
    /// Filters that need cluster access are skipped when `lookup` is `None`.
    pub fn with_all_filters(config: &FilterConfig, lookup: Option<Arc<dyn ClusterLookup>>) -> Self {
        let mut engine = Self::new();
        let enabled = filters::all_filters(config, lookup)
            .into_iter()
            .filter(|filter| {
                let disabled = config.is_disabled(filter.name());
                if disabled {
                    crate::debug_event!("filter", "disabled", "{}", filter.name());
                }
                !disabled
            });
        engine.register(enabled);
        engine
    }

    /// Append filters, preserving order.
    pub fn register(&mut self, filters: impl IntoIterator<Item = Box<dyn Filter>>) {
        for filter in filters {
            crate::debug_event!("filter", "registered", "{}: {}", filter.name(), filter.describe());
            self.filters.push(filter);
        }
    }

    /// Names of registered filters in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|f| f.name())
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run every filter in order until one vetoes.
    ///
    /// The veto is recorded on both the report and the event annotations.
    pub fn run(&self, event: &mut Event) -> FilterReport {
        let mut report = FilterReport::default();

        for filter in &self.filters {
            match filter.apply(event) {
                Ok(Verdict::Pass) => {}
                Ok(Verdict::Veto(reason)) => {
                    crate::debug_event!(
                        "filter",
                        "vetoed",
                        "{} by {}: {reason}",
                        event.kind,
                        filter.name()
                    );
                    let suppression = Suppression {
                        filter: filter.name().to_string(),
                        reason,
                    };
                    event.annotations.suppressed = Some(suppression.clone());
                    report.veto = Some(suppression);
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        "[filter] {} failed open for {}: {e}",
                        filter.name(),
                        event.kind
                    );
                    event.annotations.failed_open.push(filter.name().to_string());
                    report.failed_open.push(filter.name().to_string());
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for FilterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterEngine")
            .field("filters", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
