//! # Server
//!
//! Virtual machine definition: running flag, CPU and memory quantities,
//! network identity, and references to disks, an ISO image and a cloud-init
//! config.
//!
//! Requests accept a few historical shapes: `running` as a string, and a
//! single `disk` instead of `disks`. Views keep `running` as a string and
//! project `disk` as the first of `disks` for the same clients. `state`,
//! `ip` and (when the spec leaves it empty) `hosting` come from status.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity as StoredQuantity;
use kube::CustomResource;
use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};

use crate::core::attachment::{resolve_reference, resolve_references, AttachedRef, ResourceRef};
use crate::core::error::{GatewayError, GatewayResult};
use crate::core::projection::{observed, prefer_spec};
use crate::core::quantity::canonical_quantity;
use crate::core::validation::validate_mac_address;
use crate::gateway::ResourceKind;

/// Virtual machine definition
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "berth.kubeberth.io",
    version = "v1alpha1",
    kind = "Server",
    plural = "servers",
    namespaced,
    status = "ServerStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    pub running: bool,
    pub cpu: StoredQuantity,
    pub memory: StoredQuantity,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mac_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hosting: String,
    #[serde(default)]
    pub disks: Vec<AttachedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isoimage: Option<AttachedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinit: Option<AttachedRef>,
}

/// Written by the controller only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub hosting: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_running")]
    pub running: bool,
    #[serde(default)]
    pub cpu: String,
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub hosting: String,
    #[serde(default)]
    pub disks: Vec<ResourceRef>,
    /// Single-disk form sent by older clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<ResourceRef>,
    #[serde(default)]
    pub isoimage: Option<ResourceRef>,
    #[serde(default)]
    pub cloudinit: Option<ResourceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerView {
    pub name: String,
    pub running: String,
    pub cpu: String,
    pub memory: String,
    pub mac_address: String,
    pub hostname: String,
    pub hosting: String,
    pub disks: Vec<ResourceRef>,
    /// First entry of `disks`, for clients that read the single-disk form
    pub disk: Option<ResourceRef>,
    pub isoimage: Option<ResourceRef>,
    pub cloudinit: Option<ResourceRef>,
    pub state: String,
    pub ip: String,
}

/// Accepts `true`/`false` or the string spellings clients historically sent
fn deserialize_running<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(false),
        Some(Flag::Bool(value)) => Ok(value),
        Some(Flag::Text(text)) => match text.trim() {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "" | "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            other => Err(D::Error::custom(format!(
                "running must be a boolean, got {:?}",
                other
            ))),
        },
    }
}

impl ResourceKind for Server {
    type Spec = ServerSpec;
    type Request = ServerRequest;
    type View = ServerView;

    fn request_name(request: &ServerRequest) -> &str {
        &request.name
    }

    fn to_spec(request: ServerRequest, namespace: &str) -> GatewayResult<ServerSpec> {
        let cpu = canonical_quantity("cpu", &request.cpu)?;
        let memory = canonical_quantity("memory", &request.memory)?;
        validate_mac_address("macAddress", &request.mac_address)?;

        let mut disks = request.disks;
        if disks.is_empty() {
            disks.extend(request.disk);
        }
        if disks.is_empty() {
            return Err(GatewayError::validation(
                "disks",
                "at least one disk is required",
            ));
        }

        Ok(ServerSpec {
            running: request.running,
            cpu,
            memory,
            mac_address: request.mac_address,
            hostname: request.hostname,
            hosting: request.hosting,
            disks: resolve_references("disks", disks, namespace)?,
            isoimage: resolve_reference("isoimage", request.isoimage, namespace)?,
            cloudinit: resolve_reference("cloudinit", request.cloudinit, namespace)?,
        })
    }

    fn from_spec(name: &str, spec: ServerSpec) -> Self {
        Server::new(name, spec)
    }

    fn replace_spec(&mut self, spec: ServerSpec) {
        self.spec = spec;
    }

    fn to_view(&self) -> ServerView {
        let status = observed(self.status.as_ref());
        ServerView {
            name: self.metadata.name.clone().unwrap_or_default(),
            running: self.spec.running.to_string(),
            cpu: self.spec.cpu.0.clone(),
            memory: self.spec.memory.0.clone(),
            mac_address: self.spec.mac_address.clone(),
            hostname: self.spec.hostname.clone(),
            hosting: prefer_spec(&self.spec.hosting, &status.hosting),
            disks: self.spec.disks.iter().map(AttachedRef::to_request).collect(),
            disk: self.spec.disks.first().map(AttachedRef::to_request),
            isoimage: self.spec.isoimage.as_ref().map(AttachedRef::to_request),
            cloudinit: self.spec.cloudinit.as_ref().map(AttachedRef::to_request),
            state: status.state,
            ip: status.ip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> ServerRequest {
        serde_json::from_value(body).unwrap()
    }

    fn minimal() -> serde_json::Value {
        json!({"name": "web", "cpu": "2", "memory": "4Gi", "disks": [{"name": "root"}]})
    }

    #[test]
    fn test_running_accepts_bool_and_strings() {
        let mut body = minimal();
        body["running"] = json!(true);
        assert!(request(body.clone()).running);
        body["running"] = json!("true");
        assert!(request(body.clone()).running);
        body["running"] = json!("False");
        assert!(!request(body.clone()).running);
        assert!(!request(minimal()).running);

        body["running"] = json!("maybe");
        assert!(serde_json::from_value::<ServerRequest>(body).is_err());
    }

    #[test]
    fn test_references_get_namespace() {
        let mut body = minimal();
        body["cloudinit"] = json!({"name": "base"});
        body["isoimage"] = json!({"name": "installer"});
        let spec = Server::to_spec(request(body), "kubeberth").unwrap();

        assert_eq!(spec.disks.len(), 1);
        assert_eq!(spec.disks[0].namespace, "kubeberth");
        assert_eq!(spec.cloudinit.unwrap().name, "base");
        assert_eq!(spec.isoimage.unwrap().name, "installer");
    }

    #[test]
    fn test_single_disk_form_is_accepted() {
        let spec = Server::to_spec(
            request(json!({"name": "web", "cpu": "1", "memory": "1Gi", "disk": {"name": "root"}})),
            "kubeberth",
        )
        .unwrap();
        assert_eq!(spec.disks[0].name, "root");
    }

    #[test]
    fn test_server_without_disks_is_rejected() {
        let err = Server::to_spec(
            request(json!({"name": "web", "cpu": "1", "memory": "1Gi"})),
            "kubeberth",
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { ref field, .. } if field == "disks"));
    }

    #[test]
    fn test_invalid_cpu_is_rejected() {
        let mut body = minimal();
        body["cpu"] = json!("abc");
        let err = Server::to_spec(request(body), "kubeberth").unwrap_err();
        assert!(matches!(err, GatewayError::Validation { ref field, .. } if field == "cpu"));
    }

    #[test]
    fn test_view_without_status_or_optional_references() {
        let server = Server::from_spec("web", Server::to_spec(request(minimal()), "kubeberth").unwrap());
        let view = serde_json::to_value(server.to_view()).unwrap();

        assert_eq!(view["running"], "false");
        assert_eq!(view["cpu"], "2");
        assert_eq!(view["memory"], "4Gi");
        assert_eq!(view["state"], "");
        assert_eq!(view["ip"], "");
        assert_eq!(view["hosting"], "");
        assert_eq!(view["cloudinit"], serde_json::Value::Null);
        assert_eq!(view["disks"], json!([{"name": "root"}]));
        assert_eq!(view["disk"], json!({"name": "root"}));
    }

    #[test]
    fn test_single_disk_view_is_first_of_many() {
        let mut body = minimal();
        body["disks"] = json!([{"name": "root"}, {"name": "data"}]);
        let server = Server::from_spec("web", Server::to_spec(request(body), "kubeberth").unwrap());
        let view = server.to_view();
        assert_eq!(view.disks.len(), 2);
        assert_eq!(view.disk, Some(ResourceRef::new("root")));
    }

    #[test]
    fn test_hosting_falls_back_to_status() {
        let mut server =
            Server::from_spec("web", Server::to_spec(request(minimal()), "kubeberth").unwrap());
        server.status = Some(ServerStatus {
            state: "Running".to_string(),
            ip: "10.0.0.12".to_string(),
            hosting: "node-3".to_string(),
        });
        let view = server.to_view();
        assert_eq!(view.hosting, "node-3");
        assert_eq!(view.state, "Running");

        server.spec.hosting = "node-1".to_string();
        assert_eq!(server.to_view().hosting, "node-1");
    }
}
