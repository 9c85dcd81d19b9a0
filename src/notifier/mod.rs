//! Notifier fanout.
//!
//! Sinks (chat platforms, search indices, webhooks) implement [`Notifier`].
//! [`Fanout`] delivers to every sink concurrently with a per-sink timeout;
//! a failing or slow sink never affects the others.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::event::Event;

/// Errors reported by a single sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Sink '{sink}' rejected delivery: {reason}")]
    Rejected { sink: String, reason: String },

    #[error("Sink '{sink}' timed out after {after:?}")]
    Timeout { sink: String, after: Duration },

    #[error("Sink '{sink}' delivery task failed: {reason}")]
    TaskFailed { sink: String, reason: String },
}

/// A notification sink. Each sink owns its retry and idempotence strategy.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sink name for logging.
    fn name(&self) -> &str;

    /// Deliver a forwarded event.
    async fn send_event(&self, event: &Event) -> Result<(), DeliveryError>;

    /// Deliver a plain text message.
    async fn send_message(&self, message: &str) -> Result<(), DeliveryError>;
}

/// Per-sink results of one fanout.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub delivered: Vec<String>,
    pub failed: Vec<DeliveryError>,
}

impl DeliveryReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delivers to every registered sink.
pub struct Fanout {
    sinks: Vec<Arc<dyn Notifier>>,
    timeout: Duration,
}

impl Fanout {
    pub fn new(sinks: Vec<Arc<dyn Notifier>>, timeout: Duration) -> Self {
        Self { sinks, timeout }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub async fn send_event(&self, event: Arc<Event>) -> DeliveryReport {
        self.deliver(|sink| {
            let event = Arc::clone(&event);
            async move { sink.send_event(&event).await }
        })
        .await
    }

    pub async fn send_message(&self, message: &str) -> DeliveryReport {
        let message: Arc<str> = Arc::from(message);
        self.deliver(|sink| {
            let message = Arc::clone(&message);
            async move { sink.send_message(&message).await }
        })
        .await
    }

    /// Spawn one task per sink, then collect every result.
    async fn deliver<F, Fut>(&self, op: F) -> DeliveryReport
    where
        F: Fn(Arc<dyn Notifier>) -> Fut,
        Fut: Future<Output = Result<(), DeliveryError>> + Send + 'static,
    {
        let handles: Vec<_> = self
            .sinks
            .iter()
            .map(|sink| {
                let name = sink.name().to_string();
                let timeout = self.timeout;
                let delivery = op(Arc::clone(sink));
                let sink_name = name.clone();
                let handle = tokio::spawn(async move {
                    match tokio::time::timeout(timeout, delivery).await {
                        Ok(result) => result,
                        Err(_) => Err(DeliveryError::Timeout {
                            sink: sink_name,
                            after: timeout,
                        }),
                    }
                });
                (name, handle)
            })
            .collect();

        let mut report = DeliveryReport::default();
        for (name, handle) in handles {
            let result = handle.await.unwrap_or_else(|e| {
                Err(DeliveryError::TaskFailed {
                    sink: name.clone(),
                    reason: e.to_string(),
                })
            });

            match result {
                Ok(()) => {
                    crate::debug_event!("fanout", "delivered", "{name}");
                    report.delivered.push(name);
                }
                Err(e) => {
                    tracing::warn!("[fanout] {name} delivery failed: {e}");
                    report.failed.push(e);
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for Fanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("Fanout")
            .field("sinks", &names)
            .field("timeout", &self.timeout)
            .finish()
    }
}
