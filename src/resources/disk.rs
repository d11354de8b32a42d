//! # Disk
//!
//! Block volume with a size and exactly one source: an archive or another
//! disk. The size is stored in canonical quantity form and the source
//! reference picks up the gateway's namespace.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity as StoredQuantity;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

use crate::core::attachment::{project_source, resolve_source, AttachedSource, SourceRequest};
use crate::core::error::GatewayResult;
use crate::core::quantity::canonical_quantity;
use crate::gateway::ResourceKind;

/// Block volume, cloned from an archive or from another disk
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "berth.kubeberth.io",
    version = "v1alpha1",
    kind = "Disk",
    plural = "disks",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpec {
    pub size: StoredQuantity,
    pub source: AttachedSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub source: Option<SourceRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskView {
    pub name: String,
    pub size: String,
    pub source: SourceRequest,
}

impl ResourceKind for Disk {
    type Spec = DiskSpec;
    type Request = DiskRequest;
    type View = DiskView;

    fn request_name(request: &DiskRequest) -> &str {
        &request.name
    }

    fn to_spec(request: DiskRequest, namespace: &str) -> GatewayResult<DiskSpec> {
        let size = canonical_quantity("size", &request.size)?;
        let source = resolve_source(request.source, namespace)?;
        Ok(DiskSpec { size, source })
    }

    fn from_spec(name: &str, spec: DiskSpec) -> Self {
        Disk::new(name, spec)
    }

    fn replace_spec(&mut self, spec: DiskSpec) {
        self.spec = spec;
    }

    fn to_view(&self) -> DiskView {
        DiskView {
            name: self.metadata.name.clone().unwrap_or_default(),
            size: self.spec.size.0.clone(),
            source: project_source(&self.spec.source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::GatewayError;
    use serde_json::json;

    fn request(body: serde_json::Value) -> DiskRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_archive_backed_disk() {
        let spec = Disk::to_spec(
            request(json!({"name": "root", "size": "20Gi", "source": {"archive": {"name": "focal"}}})),
            "kubeberth",
        )
        .unwrap();
        assert_eq!(spec.size.0, "20Gi");
        assert!(matches!(spec.source, AttachedSource::Archive(ref r) if r.name == "focal" && r.namespace == "kubeberth"));
    }

    #[test]
    fn test_size_is_canonicalised() {
        let spec = Disk::to_spec(
            request(json!({"name": "root", "size": "10240Mi", "source": {"disk": {"name": "base"}}})),
            "kubeberth",
        )
        .unwrap();
        assert_eq!(spec.size.0, "10Gi");
    }

    #[test]
    fn test_invalid_size_is_rejected() {
        let err = Disk::to_spec(
            request(json!({"name": "root", "size": "big", "source": {"disk": {"name": "base"}}})),
            "kubeberth",
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { ref field, .. } if field == "size"));
    }

    #[test]
    fn test_missing_source_is_rejected() {
        let err = Disk::to_spec(request(json!({"name": "root", "size": "1Gi"})), "kubeberth")
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { ref field, .. } if field == "source"));
    }

    #[test]
    fn test_view_round_trips_source_shape() {
        let disk = Disk::from_spec(
            "root",
            Disk::to_spec(
                request(json!({"name": "root", "size": "1Gi", "source": {"disk": {"name": "base"}}})),
                "kubeberth",
            )
            .unwrap(),
        );
        assert_eq!(
            serde_json::to_value(disk.to_view()).unwrap(),
            json!({"name": "root", "size": "1Gi", "source": {"disk": {"name": "base"}}})
        );
    }
}
