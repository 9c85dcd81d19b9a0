//! Validates that objects referenced by a new Ingress exist.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::event::Event;
use crate::filter::{ClusterLookup, Filter, FilterError, ServicePort, Verdict};

pub struct IngressValidator {
    lookup: Arc<dyn ClusterLookup>,
    timeout: Duration,
}

/// Backend service reference from `spec.rules[].http.paths[].backend.service`.
#[derive(Debug, PartialEq, Eq)]
struct BackendService {
    name: String,
    port: Option<ServicePort>,
}

impl IngressValidator {
    pub fn new(lookup: Arc<dyn ClusterLookup>, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }
}

impl Filter for IngressValidator {
    fn name(&self) -> &str {
        "ingress-validator"
    }

    fn describe(&self) -> &str {
        "Checks if services and tls secrets used in ingress specs are available."
    }

    fn apply(&self, event: &mut Event) -> Result<Verdict, FilterError> {
        if !event.is_creation_of("Ingress") {
            return Ok(Verdict::Pass);
        }

        let namespace = event.namespace().to_string();
        let mut first_error = None;

        for backend in backend_services(&event.object) {
            let lookup = self.lookup.service_exists(
                &namespace,
                &backend.name,
                backend.port.as_ref(),
                self.timeout,
            );
            match lookup {
                Ok(true) => {}
                Ok(false) => {
                    let port = backend
                        .port
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    event.annotations.warnings.push(format!(
                        "Service '{}' used in ingress '{}' config does not exist or port '{port}' not exposed",
                        backend.name, event.name
                    ));
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        for secret in tls_secrets(&event.object) {
            match self.lookup.secret_exists(&namespace, &secret, self.timeout) {
                Ok(true) => {}
                Ok(false) => event
                    .annotations
                    .warnings
                    .push(format!("TLS secret {secret} does not exist")),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        // Every check has run; report the first failed lookup
        match first_error {
            Some(e) => Err(e),
            None => Ok(Verdict::Pass),
        }
    }
}

fn backend_services(ingress: &Value) -> Vec<BackendService> {
    let rules = ingress
        .pointer("/spec/rules")
        .and_then(Value::as_array)
        .into_iter()
        .flatten();

    let mut services: Vec<BackendService> = Vec::new();
    for rule in rules {
        let paths = rule
            .pointer("/http/paths")
            .and_then(Value::as_array)
            .into_iter()
            .flatten();
        for path in paths {
            let Some(service) = path.pointer("/backend/service") else {
                continue;
            };
            let Some(name) = service.get("name").and_then(Value::as_str) else {
                continue;
            };
            let port = service.get("port").and_then(|port| {
                port.get("number")
                    .and_then(Value::as_u64)
                    .and_then(|n| u16::try_from(n).ok())
                    .map(ServicePort::Number)
                    .or_else(|| {
                        port.get("name")
                            .and_then(Value::as_str)
                            .map(|n| ServicePort::Name(n.to_string()))
                    })
            });

            let backend = BackendService {
                name: name.to_string(),
                port,
            };
            if !services.contains(&backend) {
                services.push(backend);
            }
        }
    }
    services
}

fn tls_secrets(ingress: &Value) -> Vec<String> {
    let mut secrets: Vec<String> = Vec::new();
    for tls in ingress
        .pointer("/spec/tls")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        if let Some(secret) = tls.get("secretName").and_then(Value::as_str)
            && !secrets.iter().any(|s| s == secret)
        {
            secrets.push(secret.to_string());
        }
    }
    secrets
}
