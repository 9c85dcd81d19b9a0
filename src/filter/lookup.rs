//! Cluster lookups used by filters that need to inspect other objects.

use std::fmt;
use std::time::Duration;

use super::FilterError;

/// Port reference as written in an Ingress backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServicePort {
    Number(u16),
    Name(String),
}

impl fmt::Display for ServicePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServicePort::Number(number) => write!(f, "{number}"),
            ServicePort::Name(name) => f.write_str(name),
        }
    }
}

/// Read-only access to cluster objects.
///
/// Implementations must return within `timeout`, reporting
/// [`FilterError::LookupTimeout`] otherwise.
pub trait ClusterLookup: Send + Sync {
    /// Whether the service exists and, when `port` is given, exposes it.
    fn service_exists(
        &self,
        namespace: &str,
        name: &str,
        port: Option<&ServicePort>,
        timeout: Duration,
    ) -> Result<bool, FilterError>;

    /// Whether the secret exists.
    fn secret_exists(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<bool, FilterError>;
}
