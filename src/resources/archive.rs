//! # Archive
//!
//! A named image repository that disks can be cloned from. The only field
//! is `repository`, which must be non-empty. Archives carry no status.

use kube::CustomResource;
use serde::{Deserialize, Serialize};

use crate::core::error::GatewayResult;
use crate::core::validation::require_non_empty;
use crate::gateway::ResourceKind;

/// Image archive a disk can be populated from
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "berth.kubeberth.io",
    version = "v1alpha1",
    kind = "Archive",
    plural = "archives",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSpec {
    pub repository: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub repository: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveView {
    pub name: String,
    pub repository: String,
}

impl ResourceKind for Archive {
    type Spec = ArchiveSpec;
    type Request = ArchiveRequest;
    type View = ArchiveView;

    fn request_name(request: &ArchiveRequest) -> &str {
        &request.name
    }

    fn to_spec(request: ArchiveRequest, _namespace: &str) -> GatewayResult<ArchiveSpec> {
        require_non_empty("repository", &request.repository)?;
        Ok(ArchiveSpec {
            repository: request.repository,
        })
    }

    fn from_spec(name: &str, spec: ArchiveSpec) -> Self {
        Archive::new(name, spec)
    }

    fn replace_spec(&mut self, spec: ArchiveSpec) {
        self.spec = spec;
    }

    fn to_view(&self) -> ArchiveView {
        ArchiveView {
            name: self.metadata.name.clone().unwrap_or_default(),
            repository: self.spec.repository.clone(),
        }
    }
}
