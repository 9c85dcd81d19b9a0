pub mod bridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod filter;
pub mod gvr;
pub mod logging;
pub mod notifier;
pub mod registry;

pub use config::Settings;
pub use controller::{Controller, DispatchSnapshot, Evaluation, Outcome};
pub use error::{ClassifyError, ConfigError, ConfigResult};
pub use event::{Event, EventKind, EventType, Level, RawEvent};
pub use filter::{ClusterLookup, Filter, FilterEngine, FilterError, Verdict};
pub use gvr::{GroupVersionResource, ParseGvrError};
pub use notifier::{DeliveryError, DeliveryReport, Fanout, Notifier};
pub use registry::{NamespaceInventory, SharedRegistry, SubscriptionRegistry};
