//! # CloudInit
//!
//! cloud-init user and network data attached to a server at boot. Requests
//! accept both `userData`/`networkData` and the older snake_case keys;
//! responses use camelCase.

use kube::CustomResource;
use serde::{Deserialize, Serialize};

use crate::core::error::GatewayResult;
use crate::gateway::ResourceKind;

/// cloud-init user and network data attached to a server at boot
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "berth.kubeberth.io",
    version = "v1alpha1",
    kind = "CloudInit",
    plural = "cloudinits",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct CloudInitSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_data: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudInitRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "user_data")]
    pub user_data: String,
    #[serde(default, alias = "network_data")]
    pub network_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudInitView {
    pub name: String,
    pub user_data: String,
    pub network_data: String,
}

impl ResourceKind for CloudInit {
    type Spec = CloudInitSpec;
    type Request = CloudInitRequest;
    type View = CloudInitView;

    fn request_name(request: &CloudInitRequest) -> &str {
        &request.name
    }

    fn to_spec(request: CloudInitRequest, _namespace: &str) -> GatewayResult<CloudInitSpec> {
        Ok(CloudInitSpec {
            user_data: request.user_data,
            network_data: request.network_data,
        })
    }

    fn from_spec(name: &str, spec: CloudInitSpec) -> Self {
        CloudInit::new(name, spec)
    }

    fn replace_spec(&mut self, spec: CloudInitSpec) {
        self.spec = spec;
    }

    fn to_view(&self) -> CloudInitView {
        CloudInitView {
            name: self.metadata.name.clone().unwrap_or_default(),
            user_data: self.spec.user_data.clone(),
            network_data: self.spec.network_data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snake_case_aliases_are_accepted() {
        let request: CloudInitRequest = serde_json::from_value(json!({
            "name": "base",
            "user_data": "#cloud-config\n",
            "network_data": "version: 2\n",
        }))
        .unwrap();
        assert_eq!(request.user_data, "#cloud-config\n");
        assert_eq!(request.network_data, "version: 2\n");
    }

    #[test]
    fn test_view_uses_camel_case_and_empty_strings() {
        let cloudinit = CloudInit::from_spec(
            "base",
            CloudInitSpec {
                user_data: "#cloud-config\n".to_string(),
                network_data: String::new(),
            },
        );
        assert_eq!(
            serde_json::to_value(cloudinit.to_view()).unwrap(),
            json!({"name": "base", "userData": "#cloud-config\n", "networkData": ""})
        );
    }
}
