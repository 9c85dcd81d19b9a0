//! Dispatch controller.
//!
//! Decides, for each raw change notification, whether it reaches the
//! notifier fanout:
//!
//! ```text
//! RawEvent -> admit (registry) -> classify -> filter (engine) -> fanout
//!                  |                 |              |
//!       SkippedNotSubscribed      Errored    SkippedByFilter
//! ```
//!
//! Admission is checked on the raw key before the candidate event is built,
//! so an unsubscribed change costs a single set lookup. The controller keeps
//! no per-event state; only the registry snapshot and atomic counters are
//! shared between concurrent calls.

mod metrics;

pub use metrics::{DispatchMetrics, DispatchSnapshot};

use std::sync::Arc;

use crate::config::Settings;
use crate::error::{ClassifyError, ConfigResult};
use crate::event::{Event, EventKind, EventType, RawEvent, Suppression};
use crate::filter::{ClusterLookup, FilterEngine};
use crate::notifier::{DeliveryReport, Fanout, Notifier};
use crate::registry::{NamespaceInventory, SharedRegistry, SubscriptionRegistry};

/// Final result of handling one raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Forwarded,
    SkippedNotSubscribed,
    SkippedByFilter,
    Errored,
}

/// Decision reached before any delivery takes place.
#[derive(Debug)]
pub enum Evaluation {
    /// Admitted and passed every filter.
    Forward(Event),
    /// No subscription for this exact kind.
    NotSubscribed(EventKind),
    /// Vetoed by a filter; the event keeps its annotations for inspection.
    Filtered { event: Event, veto: Suppression },
    /// The payload could not be turned into a candidate event.
    Errored { kind: EventKind, error: ClassifyError },
}

impl Evaluation {
    pub fn outcome(&self) -> Outcome {
        match self {
            Evaluation::Forward(_) => Outcome::Forwarded,
            Evaluation::NotSubscribed(_) => Outcome::SkippedNotSubscribed,
            Evaluation::Filtered { .. } => Outcome::SkippedByFilter,
            Evaluation::Errored { .. } => Outcome::Errored,
        }
    }
}

/// Routes observed changes through admission and filtering to the sinks.
#[derive(Debug)]
pub struct Controller {
    cluster_name: String,
    registry: SharedRegistry,
    engine: FilterEngine,
    fanout: Fanout,
    metrics: DispatchMetrics,
}

impl Controller {
    pub fn new(
        cluster_name: impl Into<String>,
        registry: SubscriptionRegistry,
        engine: FilterEngine,
        fanout: Fanout,
    ) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            registry: SharedRegistry::new(registry),
            engine,
            fanout,
            metrics: DispatchMetrics::new(),
        }
    }

    /// Build a controller with the built-in filters from settings.
    ///
    /// Any configuration error surfaces here, before the first event.
    pub fn from_settings(
        settings: &Settings,
        inventory: &NamespaceInventory,
        lookup: Option<Arc<dyn ClusterLookup>>,
        sinks: Vec<Arc<dyn Notifier>>,
    ) -> ConfigResult<Self> {
        let registry = SubscriptionRegistry::build(&settings.resources, inventory)?;
        let engine = FilterEngine::with_all_filters(&settings.filters, lookup);
        let fanout = Fanout::new(sinks, settings.delivery_timeout());

        crate::log_event!(
            "controller",
            "configured",
            "{} subscriptions, {} filters, {} sinks",
            registry.len(),
            engine.len(),
            fanout.len()
        );

        Ok(Self::new(settings.cluster_name.clone(), registry, engine, fanout))
    }

    /// Exact-match admission check on already canonical inputs.
    pub fn should_send_event(
        &self,
        namespace: &str,
        resource: &str,
        event_type: EventType,
    ) -> bool {
        self.registry
            .contains(&EventKind::new(resource, namespace, event_type))
    }

    /// Admit, classify and filter without delivering.
    ///
    /// Outcome and fail-open counters are both recorded here.
    pub fn evaluate(&self, raw: RawEvent) -> Evaluation {
        let evaluation = self.decide(raw);
        self.metrics.record(evaluation.outcome());
        evaluation
    }

    fn decide(&self, raw: RawEvent) -> Evaluation {
        let kind = raw.kind();
        if !self.registry.contains(&kind) {
            crate::debug_event!("controller", "not subscribed", "{kind}");
            return Evaluation::NotSubscribed(kind);
        }

        let mut event = match Event::classify(raw, &self.cluster_name) {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!("[controller] cannot classify {kind}: {error}");
                return Evaluation::Errored { kind, error };
            }
        };

        let report = self.engine.run(&mut event);
        self.metrics.record_failed_open(report.failed_open.len());

        match report.veto {
            Some(veto) => Evaluation::Filtered { event, veto },
            None => Evaluation::Forward(event),
        }
    }

    /// Evaluate and, if the event passes, deliver it to every sink.
    ///
    /// Delivery failures are logged per sink and do not change the outcome.
    pub async fn handle(&self, raw: RawEvent) -> Outcome {
        let evaluation = self.evaluate(raw);
        let outcome = evaluation.outcome();

        if let Evaluation::Forward(event) = evaluation {
            crate::log_event!("controller", "forwarding", "{} {}", event.kind, event.name);
            let report = self.fanout.send_event(Arc::new(event)).await;
            self.metrics.record_delivery_failures(report.failed.len());
        }

        outcome
    }

    /// Rebuild the registry from settings and swap it in.
    ///
    /// On error the current registry stays in place.
    pub fn reload(&self, settings: &Settings, inventory: &NamespaceInventory) -> ConfigResult<()> {
        let registry = SubscriptionRegistry::build(&settings.resources, inventory)?;
        let count = registry.len();
        self.registry.store(registry);
        crate::log_event!("controller", "registry reloaded", "{count} subscriptions");
        Ok(())
    }

    /// Current registry snapshot.
    pub fn registry(&self) -> Arc<SubscriptionRegistry> {
        self.registry.load()
    }

    /// Tell every sink the controller is up.
    pub async fn announce_start(&self) -> DeliveryReport {
        let message = format!("Notifications started for {} cluster", self.cluster_name);
        let report = self.fanout.send_message(&message).await;
        self.metrics.record_delivery_failures(report.failed.len());
        report
    }

    pub fn metrics(&self) -> DispatchSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gvr::{GroupVersionResource, encode};
    use std::time::Duration;

    fn controller_with(kinds: Vec<EventKind>) -> Controller {
        Controller::new(
            "test",
            SubscriptionRegistry::from_kinds(kinds).unwrap(),
            FilterEngine::new(),
            Fanout::new(Vec::new(), Duration::from_secs(1)),
        )
    }

    #[test]
    fn test_should_send_event_skip_error() {
        let controller = controller_with(vec![EventKind::new(
            "v1/pods",
            "dummy",
            EventType::Error,
        )]);

        let cases = [
            // error event not allowed for pods in the test namespace
            ("test", GroupVersionResource::new("", "v1", "pods")),
            // services were never configured
            ("test", GroupVersionResource::new("", "v1", "services")),
        ];
        for (namespace, gvr) in cases {
            assert!(!controller.should_send_event(namespace, &encode(&gvr), EventType::Error));
        }

        assert!(controller.should_send_event("dummy", "v1/pods", EventType::Error));
    }

    #[test]
    fn test_should_send_event_skip_update() {
        let controller = controller_with(vec![EventKind::new(
            "v1/pods",
            "dummy",
            EventType::Delete,
        )]);

        assert!(!controller.should_send_event("test", "v1/pods", EventType::Update));
        assert!(!controller.should_send_event("", "v1/namespaces", EventType::Update));
        assert!(!controller.should_send_event("dummy", "v1/pods", EventType::Update));
    }

    #[test]
    fn test_should_send_event_skip_delete() {
        let controller = controller_with(vec![EventKind::new(
            "v1/pods",
            "dummy",
            EventType::Delete,
        )]);

        assert!(!controller.should_send_event("test", "v1/pods", EventType::Delete));
        assert!(!controller.should_send_event("test", "v1/services", EventType::Delete));
        assert!(controller.should_send_event("dummy", "v1/pods", EventType::Delete));
    }

    #[test]
    fn test_evaluation_outcomes() {
        let controller = controller_with(vec![EventKind::new(
            "v1/pods",
            "default",
            EventType::Create,
        )]);

        let skipped = controller.evaluate(RawEvent::new(
            serde_json::json!({"kind": "Pod", "metadata": {"name": "web"}}),
            "other",
            "v1/pods",
            EventType::Create,
        ));
        assert_eq!(skipped.outcome(), Outcome::SkippedNotSubscribed);

        let errored = controller.evaluate(RawEvent::new(
            serde_json::json!([1, 2, 3]),
            "default",
            "v1/pods",
            EventType::Create,
        ));
        assert_eq!(errored.outcome(), Outcome::Errored);

        let forwarded = controller.evaluate(RawEvent::new(
            serde_json::json!({"kind": "Pod", "metadata": {"name": "web"}}),
            "default",
            "v1/pods",
            EventType::Create,
        ));
        match forwarded {
            Evaluation::Forward(event) => assert_eq!(event.cluster, "test"),
            other => panic!("expected forward, got {other:?}"),
        }
    }

    #[test]
    fn test_concurrent_evaluate_matches_sequential() {
        let registry = SubscriptionRegistry::from_kinds(vec![
            EventKind::new("v1/pods", "default", EventType::Create),
            EventKind::new("v1/nodes", "", EventType::Error),
        ])
        .unwrap();
        let mut engine = FilterEngine::new();
        engine.register(crate::filter::filters::all_filters(
            &crate::config::FilterConfig::default(),
            None,
        ));
        let controller = Controller::new(
            "test",
            registry,
            engine,
            Fanout::new(Vec::new(), Duration::from_secs(1)),
        );

        let raw_events: Vec<RawEvent> = (0..64)
            .map(|i| match i % 4 {
                0 => RawEvent::new(
                    serde_json::json!({
                        "kind": "Pod",
                        "metadata": {"name": format!("pod-{i}")},
                        "spec": {"containers": []},
                    }),
                    "default",
                    "v1/pods",
                    EventType::Create,
                ),
                1 => RawEvent::new(
                    serde_json::json!({
                        "kind": "Node",
                        "metadata": {"name": "n"},
                        "reason": "Rebooted",
                    }),
                    "",
                    "v1/nodes",
                    EventType::Error,
                ),
                2 => RawEvent::new(
                    serde_json::json!("oops"),
                    "default",
                    "v1/pods",
                    EventType::Create,
                ),
                _ => RawEvent::new(
                    serde_json::json!({"kind": "Pod", "metadata": {"name": "x"}}),
                    "default",
                    "v1/pods",
                    EventType::Delete,
                ),
            })
            .collect();

        let sequential: Vec<Outcome> = raw_events
            .iter()
            .map(|raw| controller.evaluate(raw.clone()).outcome())
            .collect();

        let concurrent: Vec<Outcome> = std::thread::scope(|scope| {
            let handles: Vec<_> = raw_events
                .iter()
                .map(|raw| {
                    let controller = &controller;
                    scope.spawn(move || controller.evaluate(raw.clone()).outcome())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(sequential, concurrent);
        assert_eq!(sequential[0], Outcome::Forwarded);
        assert_eq!(sequential[1], Outcome::SkippedByFilter);
        assert_eq!(sequential[2], Outcome::Errored);
        assert_eq!(sequential[3], Outcome::SkippedNotSubscribed);
    }

    #[test]
    fn test_evaluate_records_outcome_with_failed_open() {
        let kind = EventKind::new("v1/pods", "default", EventType::Create);
        let registry = SubscriptionRegistry::from_kinds([kind]).unwrap();
        let mut engine = FilterEngine::new();
        engine.register(crate::filter::filters::all_filters(
            &crate::config::FilterConfig::default(),
            None,
        ));
        let controller = Controller::new(
            "test",
            registry,
            engine,
            Fanout::new(Vec::new(), Duration::from_secs(1)),
        );

        // No spec.containers: the image tag check fails open
        let raw = RawEvent::new(
            serde_json::json!({"kind": "Pod", "metadata": {"name": "web", "labels": {"a": "b"}}}),
            "default",
            "v1/pods",
            EventType::Create,
        );
        assert_eq!(controller.evaluate(raw).outcome(), Outcome::Forwarded);

        let metrics = controller.metrics();
        assert_eq!(metrics.failed_open, 1);
        assert_eq!(metrics.forwarded, 1);
        assert_eq!(metrics.total(), 1);
    }
}
