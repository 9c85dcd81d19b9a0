//! Configuration module for the notification core.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `KUBENOTIFY_` and use double
//! underscores to separate nested levels:
//! - `KUBENOTIFY_CLUSTER_NAME=prod` sets `cluster_name`
//! - `KUBENOTIFY_FILTERS__LOOKUP_TIMEOUT_MS=500` sets `filters.lookup_timeout_ms`
//! - `KUBENOTIFY_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::event::EventType;

/// Namespace selector that expands to every namespace in the inventory.
pub const ALL_NAMESPACES: &str = "all";

const ENV_PREFIX: &str = "KUBENOTIFY_";
const CONFIG_DIR: &str = ".kubenotify";
const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Cluster name shown in forwarded messages
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// Upper bound for a single sink delivery
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,

    /// Namespaces used to expand the `all` selector
    #[serde(default = "default_known_namespaces")]
    pub known_namespaces: Vec<String>,

    /// Resources to watch and the events to forward for each
    #[serde(default = "default_resources")]
    pub resources: Vec<ResourceConfig>,

    #[serde(default)]
    pub filters: FilterConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One subscription entry: a resource type, its namespace scope and events.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ResourceConfig {
    /// Canonical resource type, e.g. `v1/pods` or `apps/v1/deployments`
    pub name: String,

    #[serde(default)]
    pub namespaces: NamespaceScope,

    pub events: Vec<EventSelector>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct NamespaceScope {
    /// Namespace names, or `all`
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// Anchored regular expressions excluded from `include`
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// Event type as written in configuration; `all` selects every type.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventSelector {
    All,
    Create,
    Update,
    Delete,
    Error,
}

impl EventSelector {
    pub fn expand(self) -> &'static [EventType] {
        match self {
            EventSelector::All => &EventType::ALL,
            EventSelector::Create => &[EventType::Create],
            EventSelector::Update => &[EventType::Update],
            EventSelector::Delete => &[EventType::Delete],
            EventSelector::Error => &[EventType::Error],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FilterConfig {
    /// Names of built-in filters that should not be registered
    #[serde(default)]
    pub disabled: Vec<String>,

    /// Upper bound for cluster lookups made by filters
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for every target
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `kubenotify::filter = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 { 1 }
fn default_cluster_name() -> String { "default".to_string() }
fn default_delivery_timeout_ms() -> u64 { 10_000 }
fn default_lookup_timeout_ms() -> u64 { 2_000 }
fn default_log_level() -> String { "warn".to_string() }
fn default_known_namespaces() -> Vec<String> { vec!["default".to_string()] }
fn default_include() -> Vec<String> { vec![ALL_NAMESPACES.to_string()] }

fn default_resources() -> Vec<ResourceConfig> {
    let entry = |name: &str, events: &[EventSelector]| ResourceConfig {
        name: name.to_string(),
        namespaces: NamespaceScope::default(),
        events: events.to_vec(),
    };

    vec![
        entry(
            "v1/pods",
            &[EventSelector::Create, EventSelector::Delete, EventSelector::Error],
        ),
        entry(
            "v1/services",
            &[EventSelector::Create, EventSelector::Delete, EventSelector::Error],
        ),
        entry("apps/v1/deployments", &[EventSelector::All]),
        entry(
            "networking.k8s.io/v1/ingresses",
            &[EventSelector::Create, EventSelector::Delete, EventSelector::Error],
        ),
        entry("v1/nodes", &[EventSelector::Error]),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            cluster_name: default_cluster_name(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
            known_namespaces: default_known_namespaces(),
            resources: default_resources(),
            filters: FilterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NamespaceScope {
    fn default() -> Self {
        Self {
            include: default_include(),
            ignore: Vec::new(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore (__) separates nested levels,
            // single underscore (_) remains as is within field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Find `.kubenotify/settings.toml` from the current directory upwards
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Save {
                reason: format!("cannot create {}: {e}", parent.display()),
            })?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| ConfigError::Save {
            reason: e.to_string(),
        })?;
        std::fs::write(path, toml_string).map_err(|e| ConfigError::Save {
            reason: format!("cannot write {}: {e}", path.display()),
        })
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }
}

impl FilterConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn is_disabled(&self, filter: &str) -> bool {
        self.disabled.iter().any(|name| name == filter)
    }
}
