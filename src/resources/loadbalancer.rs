//! # LoadBalancer
//!
//! Spreads traffic over a set of servers. Backends are server names resolved
//! into the gateway's namespace; ports use the core `ServicePort` shape and
//! are checked for range, protocol and (with more than one) unique names.
//! Per-backend health is reported in `backendsStatus`.

use std::collections::{BTreeMap, HashSet};

use k8s_openapi::api::core::v1::ServicePort;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

use crate::core::error::{GatewayError, GatewayResult};
use crate::core::projection::observed;
use crate::core::validation::validate_name;
use crate::gateway::ResourceKind;

const PROTOCOLS: [&str; 3] = ["TCP", "UDP", "SCTP"];

/// Front end that spreads traffic over a set of servers
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "berth.kubeberth.io",
    version = "v1alpha1",
    kind = "LoadBalancer",
    plural = "loadbalancers",
    namespaced,
    status = "LoadBalancerStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerSpec {
    pub backends: Vec<Destination>,
    pub ports: Vec<ServicePort>,
}

/// Server a load balancer forwards to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub namespace: String,
    pub server: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub ip: String,
    /// Health per backend server name
    #[serde(default)]
    pub backends_status: BTreeMap<String, String>,
    #[serde(default)]
    pub health: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendRef {
    pub server: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancerRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub backends: Vec<BackendRef>,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerView {
    pub name: String,
    pub state: String,
    pub ip: String,
    pub backends: Vec<BackendRef>,
    pub ports: Vec<ServicePort>,
    pub backends_status: BTreeMap<String, String>,
    pub health: String,
}

fn validate_ports(ports: &[ServicePort]) -> GatewayResult<()> {
    if ports.is_empty() {
        return Err(GatewayError::validation("ports", "at least one port is required"));
    }

    let mut names = HashSet::new();
    for (i, port) in ports.iter().enumerate() {
        if !(1..=65535).contains(&port.port) {
            return Err(GatewayError::validation(
                format!("ports[{}].port", i),
                format!("{} is outside 1-65535", port.port),
            ));
        }
        if let Some(protocol) = &port.protocol {
            if !PROTOCOLS.contains(&protocol.as_str()) {
                return Err(GatewayError::validation(
                    format!("ports[{}].protocol", i),
                    format!("unsupported protocol {:?}", protocol),
                ));
            }
        }
        // multi-port services need distinct names
        if ports.len() > 1 {
            let name = port.name.as_deref().unwrap_or_default();
            if name.is_empty() || !names.insert(name) {
                return Err(GatewayError::validation(
                    format!("ports[{}].name", i),
                    "each port needs a unique name when more than one port is given",
                ));
            }
        }
    }
    Ok(())
}

impl ResourceKind for LoadBalancer {
    type Spec = LoadBalancerSpec;
    type Request = LoadBalancerRequest;
    type View = LoadBalancerView;

    fn request_name(request: &LoadBalancerRequest) -> &str {
        &request.name
    }

    fn to_spec(request: LoadBalancerRequest, namespace: &str) -> GatewayResult<LoadBalancerSpec> {
        if request.backends.is_empty() {
            return Err(GatewayError::validation(
                "backends",
                "at least one backend is required",
            ));
        }
        validate_ports(&request.ports)?;

        let backends = request
            .backends
            .into_iter()
            .enumerate()
            .map(|(i, backend)| {
                validate_name(&format!("backends[{}].server", i), &backend.server)?;
                Ok(Destination {
                    namespace: namespace.to_string(),
                    server: backend.server,
                })
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        Ok(LoadBalancerSpec {
            backends,
            ports: request.ports,
        })
    }

    fn from_spec(name: &str, spec: LoadBalancerSpec) -> Self {
        LoadBalancer::new(name, spec)
    }

    fn replace_spec(&mut self, spec: LoadBalancerSpec) {
        self.spec = spec;
    }

    fn to_view(&self) -> LoadBalancerView {
        let status = observed(self.status.as_ref());
        LoadBalancerView {
            name: self.metadata.name.clone().unwrap_or_default(),
            state: status.state,
            ip: status.ip,
            backends: self
                .spec
                .backends
                .iter()
                .map(|d| BackendRef {
                    server: d.server.clone(),
                })
                .collect(),
            ports: self.spec.ports.clone(),
            backends_status: status.backends_status,
            health: status.health,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> LoadBalancerRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_backends_get_namespace() {
        let spec = LoadBalancer::to_spec(
            request(json!({
                "name": "lb",
                "backends": [{"server": "web-1"}, {"server": "web-2"}],
                "ports": [{"name": "http", "port": 80, "protocol": "TCP", "targetPort": 8080}],
            })),
            "kubeberth",
        )
        .unwrap();
        assert_eq!(spec.backends.len(), 2);
        assert!(spec.backends.iter().all(|b| b.namespace == "kubeberth"));
        assert_eq!(spec.ports[0].port, 80);
    }

    #[test]
    fn test_port_validation() {
        let bad_port = request(json!({
            "name": "lb",
            "backends": [{"server": "web-1"}],
            "ports": [{"port": 70000}],
        }));
        assert!(LoadBalancer::to_spec(bad_port, "kubeberth").is_err());

        let bad_protocol = request(json!({
            "name": "lb",
            "backends": [{"server": "web-1"}],
            "ports": [{"port": 80, "protocol": "HTTP"}],
        }));
        assert!(LoadBalancer::to_spec(bad_protocol, "kubeberth").is_err());

        let unnamed = request(json!({
            "name": "lb",
            "backends": [{"server": "web-1"}],
            "ports": [{"port": 80}, {"port": 443}],
        }));
        assert!(LoadBalancer::to_spec(unnamed, "kubeberth").is_err());

        let no_ports = request(json!({"name": "lb", "backends": [{"server": "web-1"}]}));
        assert!(LoadBalancer::to_spec(no_ports, "kubeberth").is_err());
    }

    #[test]
    fn test_backends_are_required() {
        let err = LoadBalancer::to_spec(
            request(json!({"name": "lb", "ports": [{"port": 80}]})),
            "kubeberth",
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { ref field, .. } if field == "backends"));
    }

    #[test]
    fn test_view_projects_status_maps() {
        let mut lb = LoadBalancer::from_spec(
            "lb",
            LoadBalancer::to_spec(
                request(json!({"name": "lb", "backends": [{"server": "web-1"}], "ports": [{"port": 80}]})),
                "kubeberth",
            )
            .unwrap(),
        );

        let view = serde_json::to_value(lb.to_view()).unwrap();
        assert_eq!(view["backendsStatus"], json!({}));
        assert_eq!(view["health"], "");

        lb.status = Some(LoadBalancerStatus {
            state: "Active".to_string(),
            ip: "192.0.2.10".to_string(),
            backends_status: BTreeMap::from([("web-1".to_string(), "Healthy".to_string())]),
            health: "Healthy".to_string(),
        });
        let view = serde_json::to_value(lb.to_view()).unwrap();
        assert_eq!(view["backends"], json!([{"server": "web-1"}]));
        assert_eq!(view["backendsStatus"]["web-1"], "Healthy");
        assert_eq!(view["ip"], "192.0.2.10");
    }
}
