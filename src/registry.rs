//! Subscription registry: the set of event kinds the operator opted into.
//!
//! The registry is an immutable value. Wildcards in configuration are
//! expanded into concrete tuples when the registry is built, so lookups are
//! exact-match only. Reloading builds a fresh registry and swaps it into a
//! [`SharedRegistry`]; readers never see a partially populated set.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;

use crate::config::{ALL_NAMESPACES, ResourceConfig, Settings};
use crate::error::{ConfigError, ConfigResult};
use crate::event::{EventKind, EventType};
use crate::gvr::{self, GroupVersionResource};

/// Namespace names known when the registry is built.
///
/// Used to expand the `all` namespace selector. Cluster-scoped objects carry
/// an empty namespace, which the wildcard always covers in addition to the
/// inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceInventory {
    namespaces: BTreeSet<String>,
}

impl NamespaceInventory {
    pub fn new(namespaces: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
        }
    }

    /// Inventory seeded from `known_namespaces` in settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.known_namespaces.iter().cloned())
    }

    /// Add namespaces discovered from the cluster.
    pub fn with_discovered(
        mut self,
        namespaces: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.namespaces.extend(namespaces.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(String::as_str)
    }
}

/// Immutable set of subscribed `(resource, namespace, event type)` tuples.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    kinds: HashSet<EventKind>,
    resources: BTreeSet<GroupVersionResource>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration entries.
    ///
    /// Resource names are decoded and stored in canonical form; namespace and
    /// event wildcards are expanded here and nowhere else.
    pub fn build(entries: &[ResourceConfig], inventory: &NamespaceInventory) -> ConfigResult<Self> {
        let mut registry = Self::new();

        for entry in entries {
            let gvr = gvr::decode(&entry.name).map_err(|source| ConfigError::InvalidResource {
                name: entry.name.clone(),
                source,
            })?;
            let resource = gvr.to_string();

            if entry.events.is_empty() {
                return Err(ConfigError::NoEvents { resource });
            }
            let event_types: BTreeSet<EventType> = entry
                .events
                .iter()
                .flat_map(|selector| selector.expand().iter().copied())
                .collect();

            let namespaces = expand_namespaces(entry, &resource, inventory)?;

            for namespace in &namespaces {
                for event_type in &event_types {
                    registry
                        .kinds
                        .insert(EventKind::new(resource.clone(), namespace.clone(), *event_type));
                }
            }
            registry.resources.insert(gvr);
        }

        crate::debug_event!(
            "registry",
            "built",
            "{} kinds across {} resources",
            registry.kinds.len(),
            registry.resources.len()
        );

        Ok(registry)
    }

    /// Build a registry from already expanded tuples.
    pub fn from_kinds(kinds: impl IntoIterator<Item = EventKind>) -> ConfigResult<Self> {
        let mut registry = Self::new();
        for kind in kinds {
            let gvr = gvr::decode(&kind.resource).map_err(|source| ConfigError::InvalidResource {
                name: kind.resource.clone(),
                source,
            })?;
            registry.resources.insert(gvr);
            registry.kinds.insert(kind);
        }
        Ok(registry)
    }

    /// Exact-match admission check.
    pub fn contains(&self, kind: &EventKind) -> bool {
        self.kinds.contains(kind)
    }

    /// Distinct resources that need a watch.
    pub fn resources(&self) -> impl Iterator<Item = &GroupVersionResource> {
        self.resources.iter()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &EventKind> {
        self.kinds.iter()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

fn expand_namespaces(
    entry: &ResourceConfig,
    resource: &str,
    inventory: &NamespaceInventory,
) -> ConfigResult<BTreeSet<String>> {
    let scope = &entry.namespaces;
    if scope.include.is_empty() {
        return Err(ConfigError::NoNamespaces {
            resource: resource.to_string(),
        });
    }

    let ignore = scope
        .ignore
        .iter()
        .map(|pattern| {
            Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                ConfigError::InvalidNamespacePattern {
                    resource: resource.to_string(),
                    pattern: pattern.clone(),
                    source,
                }
            })
        })
        .collect::<ConfigResult<Vec<_>>>()?;

    let mut namespaces = BTreeSet::new();
    for include in &scope.include {
        if include == ALL_NAMESPACES {
            if inventory.is_empty() {
                return Err(ConfigError::WildcardWithoutInventory {
                    resource: resource.to_string(),
                });
            }
            namespaces.extend(inventory.iter().map(str::to_string));
            namespaces.insert(String::new());
        } else {
            namespaces.insert(include.clone());
        }
    }

    // The empty cluster-scope namespace is never matched by ignore patterns.
    namespaces.retain(|ns| ns.is_empty() || !ignore.iter().any(|re| re.is_match(ns)));
    Ok(namespaces)
}

/// Atomically swappable handle to the current registry.
///
/// `load` hands out a snapshot that stays valid and unchanged for as long as
/// the caller holds it; `store` replaces the snapshot wholesale.
#[derive(Debug)]
pub struct SharedRegistry {
    current: RwLock<Arc<SubscriptionRegistry>>,
}

impl SharedRegistry {
    pub fn new(registry: SubscriptionRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<SubscriptionRegistry> {
        self.current.read().clone()
    }

    /// Replace the registry, returning the previous snapshot.
    pub fn store(&self, registry: SubscriptionRegistry) -> Arc<SubscriptionRegistry> {
        let next = Arc::new(registry);
        std::mem::replace(&mut *self.current.write(), next)
    }

    pub fn contains(&self, kind: &EventKind) -> bool {
        self.current.read().contains(kind)
    }
}

impl Default for SharedRegistry {
    fn default() -> Self {
        Self::new(SubscriptionRegistry::new())
    }
}
