use std::sync::Arc;

use async_trait::async_trait;
use kubenotify::config::{EventSelector, NamespaceScope, ResourceConfig};
use kubenotify::{
    Controller, DeliveryError, Event, EventType, NamespaceInventory, Notifier, Outcome, RawEvent,
    Settings,
};
use parking_lot::Mutex;
use serde_json::{Value, json};

/// Sink that records what it receives, optionally rejecting everything.
struct RecordingSink {
    name: &'static str,
    reject: bool,
    events: Mutex<Vec<Event>>,
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn new(name: &'static str, reject: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            reject,
            events: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
        })
    }

    fn check(&self) -> Result<(), DeliveryError> {
        if self.reject {
            return Err(DeliveryError::Rejected {
                sink: self.name.to_string(),
                reason: "channel not found".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingSink {
    fn name(&self) -> &str {
        self.name
    }

    async fn send_event(&self, event: &Event) -> Result<(), DeliveryError> {
        self.check()?;
        self.events.lock().push(event.clone());
        Ok(())
    }

    async fn send_message(&self, message: &str) -> Result<(), DeliveryError> {
        self.check()?;
        self.messages.lock().push(message.to_string());
        Ok(())
    }
}

fn resource(name: &str, include: &[&str], events: &[EventSelector]) -> ResourceConfig {
    ResourceConfig {
        name: name.to_string(),
        namespaces: NamespaceScope {
            include: include.iter().map(|s| s.to_string()).collect(),
            ignore: Vec::new(),
        },
        events: events.to_vec(),
    }
}

fn settings() -> Settings {
    Settings {
        cluster_name: "prod".to_string(),
        delivery_timeout_ms: 500,
        resources: vec![
            resource("v1/pods", &["default"], &[EventSelector::Create, EventSelector::Delete]),
            resource("v1/nodes", &["all"], &[EventSelector::Error]),
        ],
        ..Settings::default()
    }
}

fn pod(name: &str, labels: Value, annotations: Value) -> Value {
    json!({
        "kind": "Pod",
        "metadata": {"name": name, "labels": labels, "annotations": annotations},
        "spec": {"containers": [{"name": "app", "image": "nginx:latest"}]},
    })
}

fn controller(sinks: Vec<Arc<dyn Notifier>>) -> Controller {
    let settings = settings();
    let inventory = NamespaceInventory::from_settings(&settings);
    Controller::from_settings(&settings, &inventory, None, sinks).unwrap()
}

#[tokio::test]
async fn test_forwarded_event_reaches_sinks_with_annotations() {
    let sink = RecordingSink::new("chat", false);
    let controller = controller(vec![sink.clone() as Arc<dyn Notifier>]);

    let raw = RawEvent::new(
        pod("web", json!({}), json!({})),
        "default",
        "v1/pods",
        EventType::Create,
    );
    assert_eq!(controller.handle(raw).await, Outcome::Forwarded);

    let events = sink.events.lock();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.cluster, "prod");
    assert_eq!(event.name, "web");
    assert_eq!(
        event.annotations.recommendations,
        vec![
            ":latest tag used in image 'nginx:latest' of Container 'app' should be avoided.",
            "pod 'web' creation without labels should be avoided.",
        ]
    );
}

#[tokio::test]
async fn test_unsubscribed_and_vetoed_events_are_not_delivered() {
    let sink = RecordingSink::new("chat", false);
    let controller = controller(vec![sink.clone() as Arc<dyn Notifier>]);

    // Update is not subscribed for pods
    let update = RawEvent::new(
        pod("web", json!({"app": "web"}), json!({})),
        "default",
        "v1/pods",
        EventType::Update,
    );
    assert_eq!(controller.handle(update).await, Outcome::SkippedNotSubscribed);

    // Namespace outside the subscription
    let other_ns = RawEvent::new(
        pod("web", json!({"app": "web"}), json!({})),
        "kube-system",
        "v1/pods",
        EventType::Create,
    );
    assert_eq!(controller.handle(other_ns).await, Outcome::SkippedNotSubscribed);

    // Object opted out of notifications
    let disabled = RawEvent::new(
        pod("quiet", json!({"app": "quiet"}), json!({"kubenotify.io/disable": "true"})),
        "default",
        "v1/pods",
        EventType::Delete,
    );
    assert_eq!(controller.handle(disabled).await, Outcome::SkippedByFilter);

    // Untracked node reason
    let node = RawEvent::new(
        json!({"kind": "Node", "metadata": {"name": "node-1"}, "reason": "Rebooted"}),
        "",
        "v1/nodes",
        EventType::Error,
    );
    assert_eq!(controller.handle(node).await, Outcome::SkippedByFilter);

    assert!(sink.events.lock().is_empty());

    let metrics = controller.metrics();
    assert_eq!(metrics.skipped_not_subscribed, 2);
    assert_eq!(metrics.skipped_by_filter, 2);
    assert_eq!(metrics.total(), 4);
}

#[tokio::test]
async fn test_cluster_scoped_node_event_is_forwarded_as_critical() {
    let sink = RecordingSink::new("chat", false);
    let controller = controller(vec![sink.clone() as Arc<dyn Notifier>]);

    let node = RawEvent::new(
        json!({"kind": "Node", "metadata": {"name": "node-1"}, "reason": "NodeNotReady"}),
        "",
        "v1/nodes",
        EventType::Error,
    );
    assert_eq!(controller.handle(node).await, Outcome::Forwarded);
    assert_eq!(sink.events.lock()[0].annotations.level, kubenotify::Level::Critical);
}

#[tokio::test]
async fn test_failing_sink_does_not_block_others() {
    let good = RecordingSink::new("good", false);
    let bad = RecordingSink::new("bad", true);
    let sinks: Vec<Arc<dyn Notifier>> = vec![bad.clone(), good.clone()];
    let controller = controller(sinks);

    let raw = RawEvent::new(
        pod("web", json!({"app": "web"}), json!({})),
        "default",
        "v1/pods",
        EventType::Delete,
    );
    assert_eq!(controller.handle(raw).await, Outcome::Forwarded);

    assert_eq!(good.events.lock().len(), 1);
    assert_eq!(controller.metrics().delivery_failures, 1);

    let report = controller.announce_start().await;
    assert_eq!(report.delivered, vec!["good"]);
    assert_eq!(*good.messages.lock(), vec!["Notifications started for prod cluster"]);
}

#[tokio::test]
async fn test_reload_swaps_registry_and_keeps_old_one_on_error() {
    let controller = controller(Vec::new());
    assert!(controller.should_send_event("default", "v1/pods", EventType::Create));
    assert!(!controller.should_send_event("default", "v1/services", EventType::Create));

    let mut next = settings();
    next.resources = vec![resource("v1/services", &["default"], &[EventSelector::All])];
    let inventory = NamespaceInventory::from_settings(&next);
    controller.reload(&next, &inventory).unwrap();

    assert!(controller.should_send_event("default", "v1/services", EventType::Update));
    assert!(!controller.should_send_event("default", "v1/pods", EventType::Create));

    let mut broken = settings();
    broken.resources = vec![resource("pods", &["default"], &[EventSelector::Create])];
    assert!(controller.reload(&broken, &inventory).is_err());

    // Previous registry is still in effect
    assert!(controller.should_send_event("default", "v1/services", EventType::Update));
}

#[test]
fn test_concurrent_lookups_during_reload() {
    let controller = Arc::new(controller(Vec::new()));
    let with_pods = settings();
    let mut without_pods = settings();
    without_pods.resources = vec![resource("v1/nodes", &["all"], &[EventSelector::Error])];
    let inventory = NamespaceInventory::from_settings(&with_pods);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let controller = Arc::clone(&controller);
            scope.spawn(move || {
                for _ in 0..1000 {
                    // Node errors are subscribed by both registries
                    assert!(controller.should_send_event("", "v1/nodes", EventType::Error));
                    let registry = controller.registry();
                    let pods = registry.contains(&kubenotify::EventKind::new(
                        "v1/pods",
                        "default",
                        EventType::Create,
                    ));
                    // A snapshot is either the old or the new registry, never a mix
                    assert_eq!(pods, registry.len() == 4);
                }
            });
        }

        for i in 0..200 {
            let next = if i % 2 == 0 { &without_pods } else { &with_pods };
            controller.reload(next, &inventory).unwrap();
        }
    });
}
