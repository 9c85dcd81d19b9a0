//! Error types shared across the pipeline.
//!
//! Configuration errors are fatal at startup or reload time. Classification
//! errors only affect the single event being processed.

use thiserror::Error;

use crate::gvr::ParseGvrError;

/// Errors from loading settings or building the subscription registry.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid resource '{name}': {source}")]
    InvalidResource {
        name: String,
        #[source]
        source: ParseGvrError,
    },

    #[error("Resource '{resource}' subscribes to no events")]
    NoEvents { resource: String },

    #[error("Resource '{resource}' includes no namespaces")]
    NoNamespaces { resource: String },

    #[error(
        "Resource '{resource}' includes all namespaces but no namespace inventory is available"
    )]
    WildcardWithoutInventory { resource: String },

    #[error("Invalid namespace pattern '{pattern}' for resource '{resource}': {source}")]
    InvalidNamespacePattern {
        resource: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Failed to save config: {reason}")]
    Save { reason: String },
}

/// Errors from turning a raw watch notification into a candidate event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("Object payload is not a JSON object")]
    NotAnObject,

    #[error("Object payload is missing field '{field}'")]
    MissingField { field: &'static str },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
