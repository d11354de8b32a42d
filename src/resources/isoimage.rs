//! # ISOImage
//!
//! Installer image a server can boot from. `size` is kept as written;
//! `state` is reported by the controller.

use kube::CustomResource;
use serde::{Deserialize, Serialize};

use crate::core::error::GatewayResult;
use crate::core::projection::observed;
use crate::core::validation::require_non_empty;
use crate::gateway::ResourceKind;

/// Installer image a server can boot from
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "berth.kubeberth.io",
    version = "v1alpha1",
    kind = "ISOImage",
    plural = "isoimages",
    namespaced,
    status = "ISOImageStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ISOImageSpec {
    pub size: String,
    pub repository: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ISOImageStatus {
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ISOImageRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub repository: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ISOImageView {
    pub name: String,
    pub state: String,
    pub size: String,
    pub repository: String,
}

impl ResourceKind for ISOImage {
    type Spec = ISOImageSpec;
    type Request = ISOImageRequest;
    type View = ISOImageView;

    fn request_name(request: &ISOImageRequest) -> &str {
        &request.name
    }

    fn to_spec(request: ISOImageRequest, _namespace: &str) -> GatewayResult<ISOImageSpec> {
        require_non_empty("size", &request.size)?;
        require_non_empty("repository", &request.repository)?;
        Ok(ISOImageSpec {
            size: request.size,
            repository: request.repository,
        })
    }

    fn from_spec(name: &str, spec: ISOImageSpec) -> Self {
        ISOImage::new(name, spec)
    }

    fn replace_spec(&mut self, spec: ISOImageSpec) {
        self.spec = spec;
    }

    fn to_view(&self) -> ISOImageView {
        ISOImageView {
            name: self.metadata.name.clone().unwrap_or_default(),
            state: observed(self.status.as_ref()).state,
            size: self.spec.size.clone(),
            repository: self.spec.repository.clone(),
        }
    }
}
